//! Core types for Atelier.
//!
//! This module provides type-safe wrappers and wire shapes for the
//! storefront domain.

pub mod cart;
pub mod email;
pub mod id;
pub mod measurement;
pub mod order;
pub mod user;

pub use cart::{CartItem, CartSync, WishlistItem, WishlistSync};
pub use email::{Email, EmailError};
pub use id::*;
pub use measurement::{MeasurementError, Measurements};
pub use order::{CustomOrder, CustomOrderError, CustomOrderRequest, CustomOrderStatus};
pub use user::{LoginRequest, ProfileUpdate, RegisterRequest, SessionUser};
