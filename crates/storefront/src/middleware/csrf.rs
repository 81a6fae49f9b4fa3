//! CSRF protection for state-changing custom endpoints.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::services::csrf::CSRF_HEADER;
use crate::state::AppState;

/// Reject requests that don't carry a valid `x-csrf-token` header.
///
/// Runs before authentication, so a missing token is a 403 whether or not
/// the caller has a session.
///
/// # Errors
///
/// Returns `AppError::Forbidden` when the header is missing or the token
/// fails validation.
pub async fn require_csrf_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(value) = request.headers().get(CSRF_HEADER) else {
        tracing::warn!(path = %request.uri().path(), "CSRF token missing");
        return Err(AppError::Forbidden("CSRF token missing".to_string()));
    };

    // A header that isn't visible ASCII can't be a token we minted
    let valid = value
        .to_str()
        .is_ok_and(|token| state.csrf().validate(token));
    if !valid {
        tracing::warn!(path = %request.uri().path(), "CSRF token rejected");
        return Err(AppError::Forbidden("Invalid CSRF token".to_string()));
    }

    Ok(next.run(request).await)
}
