//! Business logic services for storefront.
//!
//! - `auth` - Email + password registration and login
//! - `csrf` - Stateless HMAC-signed CSRF tokens

pub mod auth;
pub mod csrf;
