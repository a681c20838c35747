//! Source-Weight Manager (C14): per-source-type relevance multipliers,
//! nudged by staff quadrant signals and batch reaction feedback, with
//! a Wilson-score batch update, a quadrant circuit breaker, and a
//! clamped output range.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{info, warn};

/// Quadrant classification of a single staff rating:
/// `A` = unedited + helpful, `B` = unedited + unhelpful, `C` = edited +
/// helpful, `D` = edited + unhelpful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    A,
    B,
    C,
    D,
}

impl Quadrant {
    pub fn classify(edited: bool, helpful: bool) -> Self {
        match (edited, helpful) {
            (false, true) => Quadrant::A,
            (false, false) => Quadrant::B,
            (true, true) => Quadrant::C,
            (true, false) => Quadrant::D,
        }
    }

    /// Relative weight of this quadrant's signal in empirical
    /// distributions, e.g. how many identical learning-engine reviews
    /// a single rating in this quadrant is worth.
    pub fn weight(self) -> f64 {
        match self {
            Quadrant::A => 1.0,
            Quadrant::B => 3.0,
            Quadrant::C => 1.5,
            Quadrant::D => 5.0,
        }
    }
}

const MIN_WEIGHT: f64 = 0.75;
const MAX_WEIGHT: f64 = 1.25;
const CIRCUIT_BREAKER_MAX_DELTA: f64 = 0.10;
const QUADRANT_LEARNING_RATE: f64 = 0.02;
const MIN_TOTAL_FOR_BATCH_UPDATE: u64 = 10;
const COLD_START_SAMPLE_CEILING: u64 = 100;
const COLD_START_LEARNING_RATE: f64 = 0.1;
const WARM_LEARNING_RATE: f64 = 0.3;
const WILSON_Z: f64 = 1.96;

/// Tunable bounds for a [`SourceWeightManager`], mirroring
/// `gw_domain::config::LearningConfig`'s C14 fields. `SourceWeightManager::new`
/// uses this struct's `Default` impl, which matches the module consts above.
#[derive(Debug, Clone, Copy)]
pub struct SourceWeightConfig {
    pub min_weight: f64,
    pub max_weight: f64,
    pub quadrant_learning_rate: f64,
    pub circuit_breaker_max_delta: f64,
    pub batch_min_samples: u64,
    pub batch_cold_start_threshold: u64,
    pub batch_lr_cold_start: f64,
    pub batch_lr_warm: f64,
}

impl Default for SourceWeightConfig {
    fn default() -> Self {
        Self {
            min_weight: MIN_WEIGHT,
            max_weight: MAX_WEIGHT,
            quadrant_learning_rate: QUADRANT_LEARNING_RATE,
            circuit_breaker_max_delta: CIRCUIT_BREAKER_MAX_DELTA,
            batch_min_samples: MIN_TOTAL_FOR_BATCH_UPDATE,
            batch_cold_start_threshold: COLD_START_SAMPLE_CEILING,
            batch_lr_cold_start: COLD_START_LEARNING_RATE,
            batch_lr_warm: WARM_LEARNING_RATE,
        }
    }
}

/// Base source-type delta applied per quadrant signal, before the
/// `QUADRANT_LEARNING_RATE` is applied. Quadrant C scales with edit
/// distance instead of using a flat delta (see
/// [`SourceWeightManager::apply_quadrant_signal`] doc) so a
/// near-verbatim edit still nudges upward slightly while a heavy
/// rewrite nets to zero.
fn base_delta(quadrant: Quadrant) -> f64 {
    match quadrant {
        Quadrant::A => 0.05,
        Quadrant::B => -0.10,
        Quadrant::C => 0.0,
        Quadrant::D => -0.10,
    }
}

/// Wilson score lower bound for a binomial proportion, z=1.96 (95%
/// confidence). Returns 0.5 when there is no data, a neutral prior.
pub fn wilson_lower_bound(positive: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.5;
    }
    let n = total as f64;
    let p_hat = positive as f64 / n;
    let z2 = WILSON_Z * WILSON_Z;
    let denominator = 1.0 + z2 / n;
    let centre = p_hat + z2 / (2.0 * n);
    let margin = WILSON_Z * ((p_hat * (1.0 - p_hat) + z2 / (4.0 * n)) / n).sqrt();
    (centre - margin) / denominator
}

fn default_weights() -> HashMap<String, f64> {
    let mut m = HashMap::new();
    m.insert("faq".to_string(), 1.2);
    m.insert("wiki".to_string(), 1.0);
    m
}

pub struct SourceWeightManager {
    weights: RwLock<HashMap<String, f64>>,
    config: SourceWeightConfig,
}

impl Default for SourceWeightManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceWeightManager {
    pub fn new() -> Self {
        Self::with_config(SourceWeightConfig::default())
    }

    /// Builds a manager with operator-tunable bounds/rates, e.g. read
    /// from `gw_domain::config::LearningConfig` at startup.
    pub fn with_config(config: SourceWeightConfig) -> Self {
        Self { weights: RwLock::new(default_weights()), config }
    }

    pub fn get_weight(&self, source_type: &str) -> f64 {
        self.weights.read().get(source_type).copied().unwrap_or(1.0)
    }

    pub fn snapshot(&self) -> HashMap<String, f64> {
        self.weights.read().clone()
    }

    /// Applies a single staff-rating quadrant signal to `source_type`.
    /// `edit_distance` (normalized, `[0,1]`) refines quadrant C's delta
    /// per the doc comment on [`base_delta`]; it is ignored for the
    /// other quadrants. Rejects (logs and no-ops) if the raw delta
    /// magnitude exceeds the circuit breaker before the learning rate
    /// is applied, as a defense against a
    /// misconfigured caller passing an oversized delta directly.
    pub fn apply_quadrant_signal(&self, source_type: &str, quadrant: Quadrant, edit_distance: f64) {
        // Quadrant C's delta is already expressed at the scale that
        // gets applied directly; the other quadrants carry a larger
        // base delta that the fixed learning rate tempers down.
        let (raw_delta, applied) = match quadrant {
            Quadrant::C => {
                let delta = self.config.quadrant_learning_rate * (1.0 - edit_distance.clamp(0.0, 1.0));
                (delta, delta)
            }
            _ => {
                let base = base_delta(quadrant);
                (base, base * self.config.quadrant_learning_rate)
            }
        };

        if raw_delta.abs() > self.config.circuit_breaker_max_delta + f64::EPSILON {
            warn!(source_type, delta = raw_delta, "quadrant delta exceeds circuit breaker, rejected");
            return;
        }

        let mut weights = self.weights.write();
        let current = *weights.get(source_type).unwrap_or(&1.0);
        let updated = (current + applied).clamp(self.config.min_weight, self.config.max_weight);
        weights.insert(source_type.to_string(), updated);
        info!(source_type, quadrant = ?quadrant, delta = applied, new_weight = updated, "applied quadrant source-weight signal");
    }

    /// Batch reaction-based update: `positive`/`total` over the
    /// trailing window (callers are expected to have already filtered
    /// to the 30-day window). Skipped (no-op) when
    /// `total` is below [`MIN_TOTAL_FOR_BATCH_UPDATE`]. Uses a higher
    /// learning rate while the source is still cold (few samples) and
    /// settles to the warm rate afterward.
    pub fn apply_batch_feedback(&self, source_type: &str, positive: u64, total: u64) {
        if total < self.config.batch_min_samples {
            return;
        }
        let score = wilson_lower_bound(positive, total);
        // Map the [0,1] Wilson score onto the weight range.
        let target = self.config.min_weight + score * (self.config.max_weight - self.config.min_weight);
        let learning_rate = if total <= self.config.batch_cold_start_threshold {
            self.config.batch_lr_cold_start
        } else {
            self.config.batch_lr_warm
        };

        let mut weights = self.weights.write();
        let current = *weights.get(source_type).unwrap_or(&1.0);
        let updated = ((1.0 - learning_rate) * current + learning_rate * target)
            .clamp(self.config.min_weight, self.config.max_weight);
        weights.insert(source_type.to_string(), updated);
        info!(
            source_type,
            positive,
            total,
            wilson_score = score,
            learning_rate,
            new_weight = updated,
            "applied batch source-weight feedback"
        );
    }
}
