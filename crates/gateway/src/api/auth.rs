//! Admin bearer-token middleware, modeled on a standard
//! hash-and-constant-time-compare API token check, scoped to this
//! gateway's one auth concept: there is no separate public API token,
//! only the admin token gating staff-facing escalation management
//! routes.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

pub async fn require_admin_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected_hash) = &state.admin_token_hash else {
        // Dev mode: no admin token configured, a warning was already
        // logged at startup.
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = provided else {
        return unauthorized();
    };

    let hash = Sha256::digest(token.as_bytes());
    if hash.as_slice().ct_eq(expected_hash).into() {
        next.run(req).await
    } else {
        unauthorized()
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "invalid or missing admin token"})),
    )
        .into_response()
}
