//! Made-to-measure order intake.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::instrument;

use atelier_core::CustomOrderRequest;

use super::ApiJson;
use crate::db::custom_orders::CustomOrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// `POST /api/custom-orders`: validate measurements and store a pending order.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ApiJson(request): ApiJson<CustomOrderRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    request.validate().map_err(|e| {
        tracing::debug!("Rejected custom order: {e}");
        AppError::BadRequest(e.to_string())
    })?;

    let order = CustomOrderRepository::new(state.pool())
        .create(current.id, &request)
        .await?;

    tracing::info!(order_id = %order.id, product_id = %order.product_id, "Custom order placed");
    Ok((StatusCode::CREATED, Json(json!({ "order": order }))))
}

/// `GET /api/custom-orders`: the caller's orders, newest first.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Value>> {
    let orders = CustomOrderRepository::new(state.pool())
        .list_for_user(current.id)
        .await?;

    Ok(Json(json!({ "orders": orders })))
}
