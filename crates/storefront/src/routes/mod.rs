//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET   /api/csrf-token           - Mint a CSRF token
//!
//! # Credentials (rate limited in the binary)
//! POST  /api/users                - Register
//! POST  /api/users/login          - Login
//!
//! # Account (requires auth)
//! GET   /api/users/me             - Session check
//! PATCH /api/users/me             - Profile update (CSRF)
//! POST  /api/users/logout         - Logout (never requires auth)
//! POST  /api/users/sync-cart      - Replace stored cart (CSRF)
//! POST  /api/users/sync-wishlist  - Replace stored wishlist (CSRF)
//!
//! # Made-to-measure (requires auth)
//! GET   /api/custom-orders        - List own orders
//! POST  /api/custom-orders        - Place an order (CSRF)
//! ```

pub mod csrf;
pub mod custom_orders;
pub mod users;

use axum::{
    Router,
    extract::FromRequest,
    routing::{get, patch, post},
};

use crate::error::AppError;
use crate::middleware::require_csrf_token;
use crate::state::AppState;

/// JSON body extractor whose rejections render as `{ "message": ... }`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Login and registration.
///
/// Kept separate so the binary can wrap them in a rate limiter.
pub fn credential_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", post(users::register))
        .route("/api/users/login", post(users::login))
}

/// Everything except the credential endpoints.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let csrf_guard = || axum::middleware::from_fn_with_state(state.clone(), require_csrf_token);

    Router::new()
        .route("/api/csrf-token", get(csrf::issue))
        .route(
            "/api/users/me",
            get(users::me).merge(patch(users::update_me).layer(csrf_guard())),
        )
        .route("/api/users/logout", post(users::logout))
        .route(
            "/api/users/sync-cart",
            post(users::sync_cart).layer(csrf_guard()),
        )
        .route(
            "/api/users/sync-wishlist",
            post(users::sync_wishlist).layer(csrf_guard()),
        )
        .route(
            "/api/custom-orders",
            get(custom_orders::list).merge(post(custom_orders::create).layer(csrf_guard())),
        )
}

/// Create all API routes for the storefront, without rate limiting.
pub fn routes(state: &AppState) -> Router<AppState> {
    credential_routes().merge(api_routes(state))
}
