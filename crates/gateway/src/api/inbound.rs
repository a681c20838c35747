//! Channel inbound surface: the HTTP entry point channel adapters
//! (or a reverse proxy in front of a real channel transport) call to
//! push an event into the pipeline, plus the reaction/feedback routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gw_domain::{ErrorCode, GatewayError, IncomingMessage, ReactionEvent};
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

fn validation_error(message: impl Into<String>) -> (StatusCode, Json<GatewayError>) {
    let err = GatewayError::new(ErrorCode::ValidationError, message);
    (StatusCode::from_u16(err.error_code.http_status()).unwrap(), Json(err))
}

/// Runs one inbound turn. Returns `202 Accepted` once the orchestrator has
/// taken the message, regardless of whether it auto-sent, queued for
/// review, or was deduplicated — the caller's concern is "was this
/// accepted", not the routing outcome, which channel adapters observe
/// via their own send/poll path instead.
pub async fn receive_message(
    State(state): State<AppState>,
    Json(incoming): Json<IncomingMessage>,
) -> Result<StatusCode, (StatusCode, Json<GatewayError>)> {
    incoming
        .validate()
        .map_err(|e| validation_error(e.to_string()))?;

    if let Some(adapter) = state.registry.get(incoming.channel.as_str()) {
        let incoming = adapter.handle_incoming(incoming);
        state.orchestrator.process_incoming(&incoming).await;
    } else {
        state.orchestrator.process_incoming(&incoming).await;
    }

    Ok(StatusCode::ACCEPTED)
}

pub async fn receive_reaction(
    State(state): State<AppState>,
    Json(event): Json<ReactionEvent>,
) -> (StatusCode, Json<serde_json::Value>) {
    if state.reactions.process(&event).await {
        (StatusCode::OK, Json(json!({"status": "recorded"})))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "MESSAGE_NOT_TRACKED"})),
        )
    }
}

#[derive(Deserialize)]
pub struct RevokeReactionRequest {
    pub channel_id: String,
    pub external_message_id: String,
    pub reactor_id: String,
}

pub async fn revoke_reaction(
    State(state): State<AppState>,
    Json(req): Json<RevokeReactionRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    if state
        .reactions
        .revoke_reaction(&req.channel_id, &req.external_message_id, &req.reactor_id)
        .await
    {
        (StatusCode::OK, Json(json!({"status": "revoked"})))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "MESSAGE_NOT_TRACKED"})),
        )
    }
}
