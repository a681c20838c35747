//! HTTP surface: a public router (health, inbound ingestion, reactions,
//! the user-facing escalation poll/rate endpoints) merged with an
//! admin-token-protected router (staff escalation management),
//! mirroring the public/protected split used elsewhere for gating a
//! privileged surface behind one middleware layer rather than
//! per-handler checks.

pub mod auth;
pub mod escalations;
pub mod feedback;
pub mod health;
pub mod inbound;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/v1/inbound", post(inbound::receive_message))
        .route("/v1/reactions", post(inbound::receive_reaction))
        .route("/v1/reactions/revoke", post(inbound::revoke_reaction))
        .route("/feedback/react", post(feedback::react))
        .route("/escalations/:message_id/response", get(escalations::poll_escalation_response))
        .route("/escalations/:message_id/rate", post(escalations::rate_escalation));

    let protected = Router::new()
        .route("/admin/escalations", get(escalations::list_escalations))
        .route("/admin/escalations/:id/claim", post(escalations::claim_escalation))
        .route("/admin/escalations/:id/respond", post(escalations::respond_escalation))
        .route("/admin/escalations/:id/close", post(escalations::close_escalation))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin_token));

    public.merge(protected).layer(TraceLayer::new_for_http())
}
