//! Auto-Send Router (C13): maps a confidence score to one of three
//! routing actions, each carrying `send_immediately`,
//! `queue_for_review`, `priority`, and an optional `flag`.

use gw_domain::{MessagePriority, RoutingAction};

/// The decision returned by [`route_response`]: action plus the
/// flags a caller needs to act on it without re-deriving them from
/// `action` alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseAction {
    pub action: RoutingAction,
    pub send_immediately: bool,
    pub queue_for_review: bool,
    pub priority: MessagePriority,
    pub flag: Option<&'static str>,
}

impl ResponseAction {
    /// Total order over actions, used to check that routing decisions
    /// are monotone in confidence: `needs_human < queue_medium < auto_send`.
    pub fn rank(&self) -> u8 {
        match self.action {
            RoutingAction::NeedsHuman => 0,
            RoutingAction::QueueMedium => 1,
            RoutingAction::AutoSend => 2,
            RoutingAction::StaffResponse => 3,
        }
    }
}

/// Pure routing function: `confidence` plus the currently resolved
/// `(t_high, t_low)` thresholds. Callers resolve
/// thresholds from the [`crate::engine::LearningEngine`] on every call
/// so admin-trained thresholds take effect without restart.
pub fn route_response(confidence: f64, thresholds: (f64, f64)) -> ResponseAction {
    let (t_high, t_low) = thresholds;
    if confidence >= t_high {
        ResponseAction {
            action: RoutingAction::AutoSend,
            send_immediately: true,
            queue_for_review: false,
            priority: MessagePriority::Normal,
            flag: None,
        }
    } else if confidence >= t_low {
        ResponseAction {
            action: RoutingAction::QueueMedium,
            send_immediately: false,
            queue_for_review: true,
            priority: MessagePriority::Normal,
            flag: None,
        }
    } else {
        ResponseAction {
            action: RoutingAction::NeedsHuman,
            send_immediately: false,
            queue_for_review: true,
            priority: MessagePriority::High,
            flag: Some("needs_human_expertise"),
        }
    }
}

pub const DEFAULT_T_HIGH: f64 = 0.95;
pub const DEFAULT_T_LOW: f64 = 0.70;

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: (f64, f64) = (DEFAULT_T_HIGH, DEFAULT_T_LOW);

    #[test]
    fn high_confidence_auto_sends() {
        let a = route_response(0.96, DEFAULTS);
        assert_eq!(a.action, RoutingAction::AutoSend);
        assert!(a.send_immediately);
        assert!(!a.queue_for_review);
    }

    #[test]
    fn exactly_95_percent_auto_sends() {
        assert_eq!(route_response(0.95, DEFAULTS).action, RoutingAction::AutoSend);
    }

    #[test]
    fn medium_confidence_queues_normal_priority() {
        let a = route_response(0.80, DEFAULTS);
        assert_eq!(a.action, RoutingAction::QueueMedium);
        assert!(a.queue_for_review);
        assert_eq!(a.priority, MessagePriority::Normal);
    }

    #[test]
    fn exactly_70_percent_queues_medium() {
        assert_eq!(route_response(0.70, DEFAULTS).action, RoutingAction::QueueMedium);
    }

    #[test]
    fn low_confidence_flags_needs_human_expertise() {
        let a = route_response(0.50, DEFAULTS);
        assert_eq!(a.action, RoutingAction::NeedsHuman);
        assert_eq!(a.priority, MessagePriority::High);
        assert_eq!(a.flag, Some("needs_human_expertise"));
    }

    #[test]
    fn zero_and_perfect_confidence_extremes() {
        assert_eq!(route_response(0.0, DEFAULTS).action, RoutingAction::NeedsHuman);
        assert_eq!(route_response(1.0, DEFAULTS).action, RoutingAction::AutoSend);
    }

    #[test]
    fn boundary_just_below_thresholds() {
        assert_eq!(route_response(0.949, DEFAULTS).action, RoutingAction::QueueMedium);
        assert_eq!(route_response(0.699, DEFAULTS).action, RoutingAction::NeedsHuman);
    }

    #[test]
    fn action_rank_is_monotone_in_confidence() {
        let confidences = [0.1, 0.5, 0.69, 0.7, 0.8, 0.94, 0.95, 1.0];
        for w in confidences.windows(2) {
            let r1 = route_response(w[0], DEFAULTS).rank();
            let r2 = route_response(w[1], DEFAULTS).rank();
            assert!(r2 >= r1, "{} -> {} should not decrease rank", w[0], w[1]);
        }
    }
}
