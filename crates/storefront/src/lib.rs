//! Atelier storefront API.
//!
//! Session-backed user endpoints, cart/wishlist sync, stateless CSRF
//! tokens and made-to-measure order intake, exposed as a library so the
//! router can be exercised in-process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
