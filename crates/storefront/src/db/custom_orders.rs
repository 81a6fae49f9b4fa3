//! Custom order repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use atelier_core::{
    CustomOrder, CustomOrderId, CustomOrderRequest, CustomOrderStatus, Measurements, UserId,
};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct CustomOrderRow {
    id: i32,
    product_id: String,
    measurements: Json<Measurements>,
    notes: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomOrderRow> for CustomOrder {
    type Error = RepositoryError;

    fn try_from(row: CustomOrderRow) -> Result<Self, Self::Error> {
        let status = CustomOrderStatus::from_db(&row.status).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("unknown order status: {}", row.status))
        })?;

        Ok(Self {
            id: CustomOrderId::new(row.id),
            product_id: row.product_id,
            measurements: row.measurements.0,
            notes: row.notes,
            status,
            created_at: row.created_at,
        })
    }
}

/// Repository for made-to-measure orders.
pub struct CustomOrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomOrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new pending order for `user_id`.
    ///
    /// The request must already be validated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        request: &CustomOrderRequest,
    ) -> Result<CustomOrder, RepositoryError> {
        let row: CustomOrderRow = sqlx::query_as(
            "INSERT INTO storefront.custom_order (account_id, product_id, measurements, notes, status) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, product_id, measurements, notes, status, created_at",
        )
        .bind(user_id.as_i32())
        .bind(request.product_id.trim())
        .bind(Json(&request.measurements))
        .bind(request.notes.as_deref())
        .bind(CustomOrderStatus::Pending.as_str())
        .fetch_one(self.pool)
        .await?;

        CustomOrder::try_from(row)
    }

    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CustomOrder>, RepositoryError> {
        let rows: Vec<CustomOrderRow> = sqlx::query_as(
            "SELECT id, product_id, measurements, notes, status, created_at \
             FROM storefront.custom_order \
             WHERE account_id = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CustomOrder::try_from).collect()
    }
}
