//! The client-side aggregate a host application holds for one visitor.

use std::sync::Arc;

use crate::api::{ApiClient, ClientError};
use crate::cart::CartStore;
use crate::config::ClientConfig;
use crate::session::{AuthSession, Navigator};
use crate::storage::{FileStorage, LocalStorage, StorageError};
use crate::sync::{SyncCoordinator, SyncHandle};
use crate::wishlist::WishlistStore;

/// Errors building a [`Shop`] from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Cart, wishlist, session, and the sync between them.
///
/// Mutations happen on the public fields; call [`Shop::sync_changes`]
/// afterwards so a logged-in user's collections reach the server.
#[derive(Debug)]
pub struct Shop {
    pub cart: CartStore,
    pub wishlist: WishlistStore,
    pub auth: AuthSession,
    sync: SyncCoordinator,
}

impl Shop {
    #[must_use]
    pub fn new(
        api: ApiClient,
        storage: Arc<dyn LocalStorage>,
        navigator: Arc<dyn Navigator>,
        sync: SyncCoordinator,
    ) -> Self {
        Self {
            cart: CartStore::new(storage.clone()),
            wishlist: WishlistStore::new(storage),
            auth: AuthSession::new(api, navigator),
            sync,
        }
    }

    /// File-backed shop for `config`.
    ///
    /// # Errors
    ///
    /// Returns `ShopError` if the storage directory can't be created or the
    /// HTTP client can't be built.
    pub fn from_config(
        config: &ClientConfig,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ShopError> {
        let storage = Arc::new(FileStorage::open(config.storage_dir.clone())?);
        let api = ApiClient::new(config.api_base_url.clone())?;
        let sync = SyncCoordinator::new(api.clone(), config.sync_retry);
        Ok(Self::new(api, storage, navigator, sync))
    }

    /// Push local collections if the user, cart or wishlist changed.
    pub fn sync_changes(&mut self) -> Option<SyncHandle> {
        let user = self.auth.user();
        self.sync.observe(
            user.as_ref(),
            self.cart.items(),
            self.wishlist.items(),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::{
        Json, Router,
        routing::{get, post},
    };
    use rust_decimal::Decimal;
    use serde_json::{Value, json};

    use atelier_core::{CartItem, WishlistItem};

    use super::*;
    use crate::session::LogNavigator;
    use crate::storage::MemoryStorage;
    use crate::sync::{RetryPolicy, SyncOutcome};
    use crate::test_support::serve;

    #[derive(Default)]
    struct Hits {
        cart: AtomicUsize,
        wishlist: AtomicUsize,
    }

    async fn shop_server(hits: Arc<Hits>) -> ApiClient {
        let cart_hits = hits.clone();
        let app = Router::new()
            .route("/api/csrf-token", get(|| async { Json(json!({ "csrfToken": "t" })) }))
            .route(
                "/api/users/login",
                post(|| async {
                    Json(json!({ "user": { "id": 9, "email": "mo@example.com" } }))
                }),
            )
            .route(
                "/api/users/sync-cart",
                post(move |Json(body): Json<Value>| {
                    let hits = cart_hits.clone();
                    async move {
                        hits.cart.fetch_add(1, Ordering::SeqCst);
                        Json(json!({ "message": "Cart synced", "cartItems": body["cartItems"] }))
                    }
                }),
            )
            .route(
                "/api/users/sync-wishlist",
                post(move |Json(body): Json<Value>| {
                    let hits = hits.clone();
                    async move {
                        hits.wishlist.fetch_add(1, Ordering::SeqCst);
                        Json(json!({
                            "message": "Wishlist synced",
                            "wishlistItems": body["wishlistItems"],
                        }))
                    }
                }),
            );
        ApiClient::new(serve(app).await).unwrap()
    }

    #[tokio::test]
    async fn test_login_pushes_local_collections_once() {
        let hits = Arc::new(Hits::default());
        let api = shop_server(hits.clone()).await;
        let sync = SyncCoordinator::new(api.clone(), RetryPolicy::new(1, Duration::ZERO));
        let mut shop = Shop::new(
            api,
            Arc::new(MemoryStorage::new()),
            Arc::new(LogNavigator),
            sync,
        );

        shop.cart.add_item(CartItem {
            id: "p1".to_string(),
            name: "Wool Coat".to_string(),
            price: Decimal::from(350),
            quantity: 1,
            image: None,
        });
        shop.wishlist.add_item(WishlistItem {
            id: "p2".to_string(),
            name: "Silk Scarf".to_string(),
            price: Decimal::from(90),
            image: None,
        });

        // Anonymous visitors never sync.
        assert!(shop.sync_changes().is_none());

        shop.auth.login("mo@example.com", "long enough").await.unwrap();
        let report = shop.sync_changes().unwrap().join().await;
        assert!(matches!(report.cart, Some(SyncOutcome::Synced { items: 1, .. })));
        assert!(matches!(report.wishlist, Some(SyncOutcome::Synced { items: 1, .. })));

        assert!(shop.sync_changes().is_none());
        assert_eq!(hits.cart.load(Ordering::SeqCst), 1);
        assert_eq!(hits.wishlist.load(Ordering::SeqCst), 1);
    }
}
