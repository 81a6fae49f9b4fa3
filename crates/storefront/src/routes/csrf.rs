//! CSRF token issuance.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::state::AppState;

/// `GET /api/csrf-token`: mint a fresh token.
///
/// Failure is reported as `{ "error": ... }` rather than the usual
/// `{ "message": ... }` body.
pub async fn issue(State(state): State<AppState>) -> Response {
    match state.csrf().generate() {
        Ok(token) => Json(json!({ "csrfToken": token })).into_response(),
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "CSRF token generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to generate CSRF token" })),
            )
                .into_response()
        }
    }
}
