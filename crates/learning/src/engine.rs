//! Learning Engine (C13): accumulates staff review outcomes and
//! periodically recomputes the Auto-Send Router's thresholds via the
//! `record_review`/`get_current_thresholds` contract. The recompute
//! formula is a gradual blend toward the empirical distribution
//! rather than a hard overwrite, to avoid single-batch threshold
//! swings.

use std::collections::HashSet;

use gw_domain::RoutingAction;
use parking_lot::Mutex;
use tracing::info;

use crate::router::{DEFAULT_T_HIGH, DEFAULT_T_LOW};

/// Staff disposition on a reviewed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Approved,
    Edited,
    Rejected,
}

#[derive(Debug, Clone)]
struct ReviewEntry {
    confidence: f64,
    admin_action: AdminAction,
    #[allow(dead_code)]
    routing_action: RoutingAction,
}

/// Caps the in-memory review history used for recompute so a long-lived
/// process doesn't grow this unbounded; old entries are dropped oldest
/// first once the cap is hit.
const MAX_HISTORY: usize = 2_000;

/// Minimum review count in the trailing blend rate: below this the
/// whole history is weighted more aggressively (matches the cold-start
/// pattern in [`crate::weights::SourceWeightManager`]).
const DEFAULT_MIN_REVIEWS_FOR_UPDATE: u64 = 50;

/// Fraction of the candidate threshold blended in on each recompute,
/// matching the warmed-up learning rate used elsewhere in this crate.
const BLEND_RATE: f64 = 0.3;

const MARGIN: f64 = 0.02;
const MIN_GAP: f64 = 0.05;

struct Thresholds {
    t_high: f64,
    t_low: f64,
}

pub struct LearningEngine {
    min_reviews_for_update: u64,
    thresholds: Mutex<Thresholds>,
    history: Mutex<Vec<ReviewEntry>>,
    seen_keys: Mutex<HashSet<String>>,
    threshold_history: Mutex<Vec<(f64, f64)>>,
}

impl Default for LearningEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_REVIEWS_FOR_UPDATE)
    }
}

impl LearningEngine {
    pub fn new(min_reviews_for_update: u64) -> Self {
        Self::with_thresholds(min_reviews_for_update, DEFAULT_T_HIGH, DEFAULT_T_LOW)
    }

    /// Builds an engine seeded from operator-configured starting
    /// thresholds, e.g. `gw_domain::config::LearningConfig::{t_high,t_low}`,
    /// rather than this crate's own compiled-in defaults.
    pub fn with_thresholds(min_reviews_for_update: u64, t_high: f64, t_low: f64) -> Self {
        Self {
            min_reviews_for_update,
            thresholds: Mutex::new(Thresholds { t_high, t_low }),
            history: Mutex::new(Vec::new()),
            seen_keys: Mutex::new(HashSet::new()),
            threshold_history: Mutex::new(Vec::new()),
        }
    }

    /// Current `(auto_send_threshold, queue_high_threshold)` resolved
    /// live, matching the usual
    /// `{"auto_send_threshold": ..., "queue_high_threshold": ...}`
    /// wiring contract.
    pub fn get_current_thresholds(&self) -> (f64, f64) {
        let t = self.thresholds.lock();
        (t.t_high, t.t_low)
    }

    /// Number of recomputes performed so far (for tests/diagnostics).
    pub fn threshold_update_count(&self) -> usize {
        self.threshold_history.lock().len()
    }

    /// Records a staff decision. `question_id` is the idempotency key:
    /// a repeat call with a `question_id` already seen is a no-op and
    /// returns `false`, preventing double-counting. Returns `true` when
    /// the review was newly recorded.
    pub fn record_review(
        &self,
        question_id: &str,
        confidence: f64,
        admin_action: AdminAction,
        routing_action: RoutingAction,
    ) -> bool {
        {
            let mut seen = self.seen_keys.lock();
            if !seen.insert(question_id.to_string()) {
                return false;
            }
        }

        {
            let mut history = self.history.lock();
            history.push(ReviewEntry { confidence, admin_action, routing_action });
            if history.len() > MAX_HISTORY {
                let overflow = history.len() - MAX_HISTORY;
                history.drain(0..overflow);
            }
        }

        self.maybe_recompute();
        true
    }

    /// Repeats [`record_review`] `weight` times under distinct derived
    /// keys so a single staff rating's quadrant weight (see
    /// [`crate::weights::Quadrant::weight`]) counts proportionally in
    /// the empirical distribution without violating the
    /// one-row-per-question_id idempotency rule above.
    pub fn record_weighted_review(
        &self,
        question_id: &str,
        confidence: f64,
        admin_action: AdminAction,
        routing_action: RoutingAction,
        weight: f64,
    ) -> u32 {
        let repeats = (weight.round() as i64).max(1) as u32;
        let mut recorded = 0;
        for i in 0..repeats {
            let key = format!("{question_id}#{i}");
            if self.record_review(&key, confidence, admin_action, routing_action) {
                recorded += 1;
            }
        }
        recorded
    }

    fn maybe_recompute(&self) {
        let history = self.history.lock();
        if (history.len() as u64) < self.min_reviews_for_update {
            return;
        }

        let approved_min = history
            .iter()
            .filter(|e| e.admin_action == AdminAction::Approved)
            .map(|e| e.confidence)
            .fold(f64::INFINITY, f64::min);
        let rejected_max = history
            .iter()
            .filter(|e| e.admin_action == AdminAction::Rejected)
            .map(|e| e.confidence)
            .fold(f64::NEG_INFINITY, f64::max);
        drop(history);

        let mut t = self.thresholds.lock();

        if approved_min.is_finite() {
            let candidate = (approved_min - MARGIN).clamp(t.t_low + MIN_GAP, 0.99);
            t.t_high = t.t_high * (1.0 - BLEND_RATE) + candidate * BLEND_RATE;
        }
        if rejected_max.is_finite() {
            let candidate = (rejected_max + MARGIN).clamp(0.05, t.t_high - MIN_GAP);
            t.t_low = t.t_low * (1.0 - BLEND_RATE) + candidate * BLEND_RATE;
        }
        if t.t_low > t.t_high - MIN_GAP {
            t.t_low = t.t_high - MIN_GAP;
        }

        let snapshot = (t.t_high, t.t_low);
        drop(t);

        self.threshold_history.lock().push(snapshot);
        info!(
            auto_send_threshold = snapshot.0,
            queue_high_threshold = snapshot.1,
            "learning engine recomputed thresholds"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::route_response;

    #[test]
    fn duplicate_question_id_does_not_double_count() {
        let engine = LearningEngine::new(2);
        assert!(engine.record_review("q1", 0.9, AdminAction::Approved, RoutingAction::AutoSend));
        assert!(!engine.record_review("q1", 0.9, AdminAction::Approved, RoutingAction::AutoSend));
        assert_eq!(engine.history.lock().len(), 1);
    }

    #[test]
    fn thresholds_unchanged_below_min_review_count() {
        let engine = LearningEngine::new(50);
        for i in 0..10 {
            engine.record_review(&format!("q{i}"), 0.4, AdminAction::Rejected, RoutingAction::NeedsHuman);
        }
        assert_eq!(engine.get_current_thresholds(), (DEFAULT_T_HIGH, DEFAULT_T_LOW));
    }

    #[test]
    fn fifty_reviews_trigger_recompute_and_stay_at_least_as_strict() {
        let engine = LearningEngine::new(50);
        for i in 0..40 {
            engine.record_review(&format!("approved{i}"), 0.85, AdminAction::Approved, RoutingAction::QueueMedium);
        }
        for i in 0..10 {
            engine.record_review(&format!("rejected{i}"), 0.40, AdminAction::Rejected, RoutingAction::NeedsHuman);
        }
        assert_eq!(engine.threshold_update_count(), 1);
        let thresholds = engine.get_current_thresholds();
        assert_ne!(thresholds, (DEFAULT_T_HIGH, DEFAULT_T_LOW));

        let at_point_eight = route_response(0.80, thresholds);
        let default_at_point_eight = route_response(0.80, (DEFAULT_T_HIGH, DEFAULT_T_LOW));
        assert!(at_point_eight.rank() <= default_at_point_eight.rank());
    }

    #[test]
    fn weighted_review_records_proportional_rows() {
        let engine = LearningEngine::new(1000);
        let recorded = engine.record_weighted_review(
            "user_rating_m1_staffA",
            0.9,
            AdminAction::Rejected,
            RoutingAction::AutoSend,
            5.0,
        );
        assert_eq!(recorded, 5);
        assert_eq!(engine.history.lock().len(), 5);
    }
}
