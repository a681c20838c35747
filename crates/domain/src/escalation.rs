//! The escalation record and its two small state enums. The
//! state machine itself (claim/respond/close, sweepers) lives in
//! `gw-escalation`; this crate only owns the shape of the data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChannelKind, DocumentReference, MessagePriority, RoutingAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    Pending,
    InReview,
    Responded,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    NotRequired,
    Pending,
    Delivered,
    Failed,
}

/// A question whose AI answer was not auto-sent and awaits a human
/// response. Uniquely keyed by `message_id`: duplicate
/// `create_escalation` calls return the existing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escalation {
    pub id: i64,
    pub message_id: String,
    pub channel: ChannelKind,
    pub channel_metadata: std::collections::HashMap<String, String>,
    pub user_id: String,
    pub question: String,
    pub ai_draft_answer: String,
    pub confidence: f64,
    pub routing_action: RoutingAction,
    #[serde(default)]
    pub routing_reason: Option<String>,
    #[serde(default)]
    pub sources: Vec<DocumentReference>,
    #[serde(default)]
    pub staff_answer: Option<String>,
    #[serde(default)]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub edit_distance: Option<f64>,
    #[serde(default)]
    pub staff_answer_rating: Option<u8>,
    pub delivery_status: DeliveryStatus,
    #[serde(default)]
    pub delivery_attempts: u32,
    #[serde(default)]
    pub delivery_error: Option<String>,
    pub status: EscalationStatus,
    pub priority: MessagePriority,
    #[serde(default)]
    pub generated_faq_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_delivery_at: Option<DateTime<Utc>>,
}

impl Escalation {
    /// Invariant check used by tests: `claimed_at`/`responded_at`/
    /// `closed_at` presence must track `status` exactly.
    pub fn timestamps_consistent(&self) -> bool {
        let claimed_ok = self.claimed_at.is_some()
            == matches!(
                self.status,
                EscalationStatus::InReview | EscalationStatus::Responded | EscalationStatus::Closed
            );
        let responded_ok = self.responded_at.is_some()
            == matches!(self.status, EscalationStatus::Responded | EscalationStatus::Closed);
        let closed_ok = self.closed_at.is_some() == matches!(self.status, EscalationStatus::Closed);
        claimed_ok && responded_ok && closed_ok
    }
}
