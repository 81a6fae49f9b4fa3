//! Cart and wishlist line items.
//!
//! These are the shapes persisted to client-side storage and sent to the
//! `sync-cart` / `sync-wishlist` endpoints. Prices travel as JSON numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product line in the shopping cart.
///
/// The `id` is the product (or variant) identifier; a cart holds at most
/// one entry per `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartItem {
    /// Price of this line (`price * quantity`), saturating at the
    /// `Decimal` bounds.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// A product saved to the wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Body of `POST /api/users/sync-cart`, also echoed back in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSync {
    pub cart_items: Vec<CartItem>,
}

/// Body of `POST /api/users/sync-wishlist`, also echoed back in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistSync {
    pub wishlist_items: Vec<WishlistItem>,
}
