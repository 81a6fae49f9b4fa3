//! User repository for database operations.
//!
//! Cart and wishlist are stored as JSONB arrays on the account row and are
//! always replaced wholesale, which keeps the sync endpoints idempotent.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use atelier_core::{CartItem, Email, ProfileUpdate, UserId, WishlistItem};

use super::RepositoryError;
use crate::models::user::User;

/// Columns selected for every account query.
const ACCOUNT_COLUMNS: &str = "id, email, first_name, last_name, profile_photo, \
                               cart, wishlist, created_at, updated_at";

/// Raw account row.
#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i32,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    profile_photo: Option<String>,
    cart: Json<Vec<CartItem>>,
    wishlist: Json<Vec<WishlistItem>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for User {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            profile_photo: row.profile_photo,
            cart: row.cart.0,
            wishlist: row.wishlist.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields needed to create an account.
pub struct NewUser<'a> {
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM storefront.account WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Create a new user together with their password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(&self, new: NewUser<'_>) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: AccountRow = sqlx::query_as(&format!(
            "INSERT INTO storefront.account (email, first_name, last_name) \
             VALUES ($1, $2, $3) \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(new.email.as_str())
        .bind(new.first_name)
        .bind(new.last_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "email"))?;

        sqlx::query(
            "INSERT INTO storefront.account_password (account_id, password_hash) VALUES ($1, $2)",
        )
        .bind(row.id)
        .bind(new.password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        User::try_from(row)
    }

    /// Get a user and their password hash by email.
    ///
    /// Returns `None` if the user doesn't exist or has no password set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<(i32, String)> = sqlx::query_as(
            "SELECT a.id, p.password_hash \
             FROM storefront.account a \
             JOIN storefront.account_password p ON a.id = p.account_id \
             WHERE a.email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        let Some((id, password_hash)) = row else {
            return Ok(None);
        };

        let user = self.get_by_id(UserId::new(id)).await?;
        Ok(user.map(|u| (u, password_hash)))
    }

    /// Replace the stored cart and return what was stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn replace_cart(
        &self,
        id: UserId,
        items: &[CartItem],
    ) -> Result<Vec<CartItem>, RepositoryError> {
        let stored: Option<Json<Vec<CartItem>>> = sqlx::query_scalar(
            "UPDATE storefront.account SET cart = $1, updated_at = NOW() \
             WHERE id = $2 RETURNING cart",
        )
        .bind(Json(items))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        stored.map(|json| json.0).ok_or(RepositoryError::NotFound)
    }

    /// Replace the stored wishlist and return what was stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn replace_wishlist(
        &self,
        id: UserId,
        items: &[WishlistItem],
    ) -> Result<Vec<WishlistItem>, RepositoryError> {
        let stored: Option<Json<Vec<WishlistItem>>> = sqlx::query_scalar(
            "UPDATE storefront.account SET wishlist = $1, updated_at = NOW() \
             WHERE id = $2 RETURNING wishlist",
        )
        .bind(Json(items))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        stored.map(|json| json.0).ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial profile update.
    ///
    /// Absent fields keep their stored value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "UPDATE storefront.account SET \
                 first_name = COALESCE($1, first_name), \
                 last_name = COALESCE($2, last_name), \
                 profile_photo = COALESCE($3, profile_photo), \
                 updated_at = NOW() \
             WHERE id = $4 \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.profile_photo.as_deref())
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound).and_then(User::try_from)
    }
}
