//! The spec-exact reaction endpoint for the (poll-only) web channel:
//! a plain `0`/`1` thumbs rating keyed by the internal `message_id`,
//! rather than the generic multi-channel `ReactionEvent` contract used
//! by `api::inbound::receive_reaction` for channels that carry their
//! own external message ids and reactor identities.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use gw_domain::{ReactionEvent, ReactionRating};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

const WEB_CHANNEL_ID: &str = "web";

#[derive(Deserialize)]
pub struct ReactRequest {
    pub message_id: String,
    pub rating: u8,
}

pub async fn react(
    State(state): State<AppState>,
    Json(req): Json<ReactRequest>,
) -> (StatusCode, Json<Value>) {
    let event = ReactionEvent {
        channel_id: WEB_CHANNEL_ID.to_string(),
        external_message_id: req.message_id.clone(),
        reactor_id: req.message_id.clone(),
        rating: if req.rating == 1 { ReactionRating::Positive } else { ReactionRating::Negative },
        raw_reaction: req.rating.to_string(),
        timestamp: Utc::now(),
    };

    if state.reactions.process(&event).await {
        let needs_feedback_followup = event.rating == ReactionRating::Negative;
        (StatusCode::OK, Json(json!({"success": true, "needs_feedback_followup": needs_feedback_followup})))
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"error": "MESSAGE_NOT_TRACKED"})))
    }
}
