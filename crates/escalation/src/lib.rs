//! Escalation Service (C10) and Response Delivery (C11). State
//! transitions (`PENDING → IN_REVIEW → RESPONDED → CLOSED`) go through
//! compare-and-update on `(status, staff_id)`; the Escalation Service
//! is the single writer to the store.

mod delivery;
mod edit_distance;
mod service;
mod store;

pub use delivery::{deliver, DeliveryOutcome};
pub use edit_distance::{normalized_edit_distance, whitespace_normalized_eq};
pub use service::{
    CreateEscalationData, EscalationFilters, EscalationService, LearningSink, ReviewRecord,
    ServiceError,
};
pub use store::EscalationStore;
