//! Bridges `gw_escalation::LearningSink` into the Learning Engine (C13)
//! and the Source-Weight Manager (C14). `gw-escalation` deliberately
//! has no dependency on `gw-learning` (see the doc comment on
//! `gw_escalation::ReviewRecord`), so this crate — the only one that
//! depends on both — owns the translation.

use std::sync::Arc;

use gw_escalation::{LearningSink, ReviewRecord};
use gw_learning::{AdminAction, LearningEngine, Quadrant, SourceWeightManager};

/// A staff edit is "no edit" only when the normalized edit distance is
/// exactly zero. Anything above that counts as an edit for threshold learning
/// purposes, matching `Quadrant::classify`'s `edited` boolean.
const EDIT_DISTANCE_EPSILON: f64 = 0.0;

const UNKNOWN_SOURCE_TYPE: &str = "unknown";

pub struct EscalationLearningBridge {
    engine: Arc<LearningEngine>,
    source_weights: Arc<SourceWeightManager>,
}

impl EscalationLearningBridge {
    pub fn new(engine: Arc<LearningEngine>, source_weights: Arc<SourceWeightManager>) -> Self {
        Self { engine, source_weights }
    }
}

impl LearningSink for EscalationLearningBridge {
    fn record_review(&self, record: ReviewRecord) {
        let edited = record.edit_distance > EDIT_DISTANCE_EPSILON;
        let admin_action = if edited { AdminAction::Edited } else { AdminAction::Approved };
        self.engine
            .record_review(&record.message_id, record.confidence, admin_action, record.routing_action);

        // The quadrant signal needs a rating (helpful/unhelpful); `respond()`
        // fires before a rating exists, so only `rate_staff_answer()`'s call
        // carries one.
        if let Some(helpful) = record.helpful {
            let quadrant = Quadrant::classify(edited, helpful);
            let source_type = record.source_type.as_deref().unwrap_or(UNKNOWN_SOURCE_TYPE);
            self.source_weights.apply_quadrant_signal(source_type, quadrant, record.edit_distance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_domain::RoutingAction;

    fn bridge() -> (Arc<LearningEngine>, Arc<SourceWeightManager>, EscalationLearningBridge) {
        let engine = Arc::new(LearningEngine::new(1));
        let weights = Arc::new(SourceWeightManager::new());
        let bridge = EscalationLearningBridge::new(engine.clone(), weights.clone());
        (engine, weights, bridge)
    }

    #[test]
    fn verbatim_staff_answer_records_approved() {
        let (engine, _weights, bridge) = bridge();
        bridge.record_review(ReviewRecord {
            message_id: "m1".into(),
            confidence: 0.4,
            edit_distance: 0.0,
            helpful: None,
            routing_action: RoutingAction::NeedsHuman,
            source_type: None,
        });
        assert_eq!(engine.threshold_update_count(), 1);
    }

    #[test]
    fn edited_staff_answer_records_edited() {
        let (engine, _weights, bridge) = bridge();
        bridge.record_review(ReviewRecord {
            message_id: "m2".into(),
            confidence: 0.4,
            edit_distance: 0.3,
            helpful: Some(true),
            routing_action: RoutingAction::NeedsHuman,
            source_type: Some("faq".into()),
        });
        assert_eq!(engine.threshold_update_count(), 1);
    }

    #[test]
    fn rated_review_nudges_source_weight() {
        let (_engine, weights, bridge) = bridge();
        let before = weights.get_weight("faq");
        bridge.record_review(ReviewRecord {
            message_id: "m3".into(),
            confidence: 0.9,
            edit_distance: 0.0,
            helpful: Some(true),
            routing_action: RoutingAction::AutoSend,
            source_type: Some("faq".into()),
        });
        assert!(weights.get_weight("faq") >= before);
    }

    #[test]
    fn unrated_review_does_not_touch_source_weights() {
        let (_engine, weights, bridge) = bridge();
        let before = weights.get_weight("faq");
        bridge.record_review(ReviewRecord {
            message_id: "m4".into(),
            confidence: 0.9,
            edit_distance: 0.0,
            helpful: None,
            routing_action: RoutingAction::AutoSend,
            source_type: Some("faq".into()),
        });
        assert_eq!(weights.get_weight("faq"), before);
    }
}
