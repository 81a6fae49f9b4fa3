//! Atelier client state.
//!
//! Cart and wishlist stores persisted to local storage, an authentication
//! session mirroring the storefront's cookie session, and the coordinator
//! that pushes local state to the server once a user logs in.
//!
//! Everything is an explicitly constructed value over injected
//! dependencies (storage backend, API client, navigator); [`Shop`] wires
//! them together for a typical host.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod session;
pub mod shop;
pub mod storage;
pub mod sync;
pub mod wishlist;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, ClientError};
pub use cart::CartStore;
pub use config::ClientConfig;
pub use session::{AuthSession, AuthState, LogNavigator, Navigator, SessionError};
pub use shop::{Shop, ShopError};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};
pub use sync::{MergeStrategy, RetryPolicy, SyncCoordinator, SyncHandle, SyncOutcome, SyncReport};
pub use wishlist::WishlistStore;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Read a JSON array from `storage`, treating any failure as empty.
fn load_collection<T: DeserializeOwned>(storage: &dyn LocalStorage, key: &str) -> Vec<T> {
    match storage.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(key, "Discarding unreadable stored collection: {e}");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            tracing::warn!(key, "Failed to read local storage: {e}");
            Vec::new()
        }
    }
}

/// Write `items` to `storage` as a JSON array, logging failures.
fn save_collection<T: Serialize>(storage: &dyn LocalStorage, key: &str, items: &[T]) {
    let raw = match serde_json::to_string(items) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(key, "Failed to serialize collection: {e}");
            return;
        }
    };

    if let Err(e) = storage.set(key, &raw) {
        tracing::warn!(key, "Failed to write local storage: {e}");
    }
}
