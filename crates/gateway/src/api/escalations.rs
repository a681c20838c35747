//! Escalation management surface: staff-facing claim/respond/close/list
//! (admin-token protected) plus the user-facing poll/rate endpoints a
//! poll-only channel (e.g. the web widget) uses to pick up the staff
//! answer once it lands.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use gw_domain::{EscalationStatus, ErrorCode, GatewayError, MessagePriority};
use gw_escalation::{deliver, DeliveryOutcome, EscalationFilters, ServiceError};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::state::AppState;

fn service_error_response(err: ServiceError) -> (StatusCode, Json<GatewayError>) {
    let (code, message) = match err {
        ServiceError::AlreadyClaimed => (ErrorCode::ResourceExists, "escalation already claimed"),
        ServiceError::NotFound => (ErrorCode::ResourceNotFound, "escalation not found"),
        ServiceError::NoStaffAnswer => (ErrorCode::ValidationError, "no staff answer recorded yet"),
        ServiceError::InvalidRating => (ErrorCode::ValidationError, "rating must be 0 or 1"),
    };
    let err = GatewayError::new(code, message);
    (StatusCode::from_u16(err.error_code.http_status()).unwrap(), Json(err))
}

#[derive(Deserialize)]
pub struct ClaimRequest {
    pub staff_id: String,
}

pub async fn claim_escalation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<gw_domain::Escalation>, (StatusCode, Json<GatewayError>)> {
    state
        .escalations
        .claim(id, &req.staff_id)
        .map(Json)
        .map_err(service_error_response)
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub staff_answer: String,
    pub staff_id: String,
}

#[derive(Serialize)]
pub struct RespondResponse {
    #[serde(flatten)]
    pub escalation: gw_domain::Escalation,
    pub delivery_outcome: &'static str,
}

/// Records the staff answer, then attempts delivery back to the
/// originating channel: poll-only channels (the web widget) are marked
/// `NotRequired` and rely on the user polling `GET .../response`
/// instead.
pub async fn respond_escalation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<RespondResponse>, (StatusCode, Json<GatewayError>)> {
    let escalation = state
        .escalations
        .respond(id, &req.staff_answer, &req.staff_id)
        .map_err(service_error_response)?;

    let outcome = deliver(&state.registry, &escalation).await;
    match outcome {
        DeliveryOutcome::NotRequired => state.escalations.mark_not_required(escalation.id),
        DeliveryOutcome::Delivered => state.escalations.record_delivery_result(escalation.id, true, None),
        DeliveryOutcome::Failed => {
            state.escalations.record_delivery_result(escalation.id, false, Some("delivery failed".into()))
        }
    }

    let escalation = state.escalations.get(escalation.id).unwrap_or(escalation);
    Ok(Json(RespondResponse {
        escalation,
        delivery_outcome: match outcome {
            DeliveryOutcome::NotRequired => "not_required",
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::Failed => "failed",
        },
    }))
}

pub async fn close_escalation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<gw_domain::Escalation>, (StatusCode, Json<GatewayError>)> {
    state.escalations.close(id).map(Json).map_err(service_error_response)
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<EscalationStatus>,
    pub channel: Option<String>,
    pub priority: Option<MessagePriority>,
    pub staff_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Serialize)]
pub struct ListResponse {
    pub escalations: Vec<gw_domain::Escalation>,
    pub counts_by_status: std::collections::HashMap<String, usize>,
}

pub async fn list_escalations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<ListResponse> {
    let filters = EscalationFilters {
        status: query.status,
        channel: query.channel,
        priority: query.priority,
        staff_id: query.staff_id,
        limit: query.limit,
        offset: query.offset,
    };
    Json(ListResponse {
        escalations: state.escalations.list(&filters),
        counts_by_status: state.escalations.counts_by_status(),
    })
}

/// The three-value status the spec's poll endpoint exposes to a user,
/// distinct from `EscalationStatus`'s four internal states: `Responded`
/// and `Closed` both read as `"resolved"` from the outside, with
/// `resolution` carrying which one it actually is.
#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    Pending,
    InReview,
    Resolved,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Responded,
    Closed,
}

#[derive(Serialize)]
pub struct PollResponse {
    pub status: PollStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_answer_rating: Option<u8>,
}

/// User-facing poll for a poll-only channel: "has my escalation been
/// answered yet". No auth — `message_id` is the correlation secret the
/// caller already holds from the original inbound request.
pub async fn poll_escalation_response(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<Json<PollResponse>, (StatusCode, Json<GatewayError>)> {
    let escalation = state.escalations.find_by_message_id(&message_id).ok_or_else(|| {
        let err = GatewayError::new(ErrorCode::ResourceNotFound, "escalation not found");
        (StatusCode::from_u16(err.error_code.http_status()).unwrap(), Json(err))
    })?;

    let (status, resolution) = match escalation.status {
        EscalationStatus::Pending => (PollStatus::Pending, None),
        EscalationStatus::InReview => (PollStatus::InReview, None),
        EscalationStatus::Responded => (PollStatus::Resolved, Some(Resolution::Responded)),
        EscalationStatus::Closed => (PollStatus::Resolved, Some(Resolution::Closed)),
    };
    // `message_id` already doubles as the correlation secret for this
    // no-auth poll; `rate_token` echoes it back only once there is
    // something to rate, so a caller with nothing to rate yet has no
    // token to mistakenly post with.
    let rate_token = escalation.staff_answer.is_some().then(|| message_id.clone());

    Ok(Json(PollResponse {
        status,
        staff_answer: escalation.staff_answer,
        responded_at: escalation.responded_at,
        resolution,
        rate_token,
        staff_answer_rating: escalation.staff_answer_rating,
    }))
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub rating: u8,
}

pub async fn rate_escalation(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(req): Json<RateRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<GatewayError>)> {
    if req.rating != 0 && req.rating != 1 {
        let err = GatewayError::new(ErrorCode::ValidationError, "rating must be 0 or 1");
        return Err((StatusCode::from_u16(err.error_code.http_status()).unwrap(), Json(err)));
    }
    state
        .escalations
        .rate_staff_answer(&message_id, req.rating)
        .map(|_| Json(json!({"status": "recorded"})))
        .map_err(service_error_response)
}
