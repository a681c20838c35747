//! Learning Engine, Auto-Send Router (C13) and Source-Weight Manager
//! (C14): turns staff review outcomes and reaction feedback into
//! updated routing thresholds and per-source relevance multipliers.
//! Deliberately has no dependency on `gw-escalation` or `gw-channels`
//! so the crate graph stays acyclic; `gw-gateway` bridges
//! `gw_escalation::ReviewRecord` into this crate's types.

pub mod engine;
pub mod router;
pub mod weights;

pub use engine::{AdminAction, LearningEngine};
pub use router::{route_response, ResponseAction, DEFAULT_T_HIGH, DEFAULT_T_LOW};
pub use weights::{wilson_lower_bound, Quadrant, SourceWeightConfig, SourceWeightManager};
