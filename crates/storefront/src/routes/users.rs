//! User account API handlers.
//!
//! Session check, email + password login and registration, logout, profile
//! updates and the cart/wishlist sync endpoints the client pushes to after
//! authenticating.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::{CartSync, LoginRequest, ProfileUpdate, RegisterRequest, SessionUser, WishlistSync};

use super::ApiJson;
use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// `{ "user": ... }` envelope.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: SessionUser,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self { user: user.into() }
    }
}

/// `GET /api/users/me`: the logged-in user, read fresh from the database.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<UserResponse>> {
    let user = load_user(&state, &current).await?;
    Ok(Json(user.into()))
}

/// `PATCH /api/users/me`: partial profile update.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn update_me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<UserResponse>> {
    let update = normalize_profile_update(update)?;

    let user = UserRepository::new(state.pool())
        .update_profile(current.id, &update)
        .await
        .map_err(|e| stale_session(e, &current))?;

    tracing::info!("Profile updated");
    Ok(Json(user.into()))
}

/// `POST /api/users/login`.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(credentials): ApiJson<LoginRequest>,
) -> Result<Json<UserResponse>> {
    let user = AuthService::new(state.pool())
        .login(&credentials.email, &credentials.password)
        .await
        .inspect_err(|e| tracing::warn!("Login failed: {e}"))?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(user.into()))
}

/// `POST /api/users`: create an account and log it in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = AuthService::new(state.pool())
        .register(&request)
        .await
        .inspect_err(|e| tracing::warn!("Registration failed: {e}"))?;

    start_session(&session, &user).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// `POST /api/users/logout`.
///
/// Always succeeds; a session store failure is logged and the cookie is
/// still dropped client-side.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> impl IntoResponse {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to flush session: {e}");
    }
    clear_sentry_user();

    Json(json!({ "message": "Logged out" }))
}

/// `POST /api/users/sync-cart`: replace the stored cart.
#[instrument(skip_all, fields(user_id = %current.id, items = payload.cart_items.len()))]
pub async fn sync_cart(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ApiJson(payload): ApiJson<CartSync>,
) -> Result<impl IntoResponse> {
    let cart_items = UserRepository::new(state.pool())
        .replace_cart(current.id, &payload.cart_items)
        .await
        .map_err(|e| stale_session(e, &current))?;

    Ok(Json(json!({
        "message": "Cart synced",
        "cartItems": cart_items,
    })))
}

/// `POST /api/users/sync-wishlist`: replace the stored wishlist.
#[instrument(skip_all, fields(user_id = %current.id, items = payload.wishlist_items.len()))]
pub async fn sync_wishlist(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ApiJson(payload): ApiJson<WishlistSync>,
) -> Result<impl IntoResponse> {
    let wishlist_items = UserRepository::new(state.pool())
        .replace_wishlist(current.id, &payload.wishlist_items)
        .await
        .map_err(|e| stale_session(e, &current))?;

    Ok(Json(json!({
        "message": "Wishlist synced",
        "wishlistItems": wishlist_items,
    })))
}

async fn load_user(state: &AppState, current: &CurrentUser) -> Result<User> {
    AuthService::new(state.pool())
        .get_user(current.id)
        .await
        .map_err(|e| match e {
            AuthError::UserNotFound => {
                tracing::warn!(user_id = %current.id, "Session refers to a deleted account");
                AppError::Unauthorized("Not authenticated".to_string())
            }
            other => other.into(),
        })
}

/// A session whose account row is gone reads as logged out.
fn stale_session(err: RepositoryError, current: &CurrentUser) -> AppError {
    match err {
        RepositoryError::NotFound => {
            tracing::warn!(user_id = %current.id, "Session refers to a deleted account");
            AppError::Unauthorized("Not authenticated".to_string())
        }
        other => other.into(),
    }
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &user.current_user()).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Trim names, drop blank fields and require photos to be http(s) URLs.
fn normalize_profile_update(update: ProfileUpdate) -> Result<ProfileUpdate> {
    let trimmed = |value: Option<String>| {
        value
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    };

    let profile_photo = trimmed(update.profile_photo);
    if let Some(photo) = profile_photo.as_deref() {
        let valid = url::Url::parse(photo)
            .is_ok_and(|url| matches!(url.scheme(), "http" | "https"));
        if !valid {
            return Err(AppError::BadRequest(
                "profilePhoto must be an http(s) URL".to_string(),
            ));
        }
    }

    Ok(ProfileUpdate {
        first_name: trimmed(update.first_name),
        last_name: trimmed(update.last_name),
        profile_photo,
    })
}
