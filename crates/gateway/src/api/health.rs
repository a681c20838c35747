//! Health surface. No metrics backend is wired in this codebase (see
//! `MetricsHook`'s doc comment), so this doubles as the metrics-equivalent
//! endpoint: it reads the channel registry's live health checks plus the
//! escalation/feedback stores directly rather than a counter.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    healthy: bool,
    channels: HashMap<String, gw_domain::HealthStatus>,
    escalations_by_status: HashMap<String, usize>,
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let channels = state.registry.health_check_all().await;
    let healthy = channels.values().all(|h| h.healthy);
    Json(HealthResponse {
        healthy,
        channels,
        escalations_by_status: state.escalations.counts_by_status(),
    })
}
