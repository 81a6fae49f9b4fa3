//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use atelier_core::{CartItem, Email, SessionUser, UserId, WishlistItem};

use super::session::CurrentUser;

/// A storefront customer account (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// URL of the uploaded profile photo.
    pub profile_photo: Option<String>,
    /// Last cart pushed by the client.
    pub cart: Vec<CartItem>,
    /// Last wishlist pushed by the client.
    pub wishlist: Vec<WishlistItem>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Identity to store in the session.
    #[must_use]
    pub fn current_user(&self) -> CurrentUser {
        CurrentUser {
            id: self.id,
            email: self.email.clone(),
        }
    }
}

impl From<User> for SessionUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            cart: Some(user.cart),
            wishlist: Some(user.wishlist),
            profile_photo: user.profile_photo,
        }
    }
}
