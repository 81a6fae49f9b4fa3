//! Atelier Core - Shared types library.
//!
//! This crate provides the types shared by every Atelier component:
//! - `storefront` - The API server backing the shop
//! - `client` - Client-side cart, wishlist and session state
//! - `cli` - Command-line tools for migrations and secrets
//!
//! # Architecture
//!
//! The core crate contains only types and pure validation - no I/O, no
//! database access, no HTTP clients. Both the server and the client speak
//! the wire shapes defined here, so a field rename is a compile error on
//! both sides instead of a silent JSON mismatch.
//!
//! # Modules
//!
//! - [`types`] - Line items, session users, measurements, custom orders,
//!   type-safe IDs and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
