//! Pushes local cart and wishlist state to the server after login.
//!
//! The coordinator is fed the current user, cart and wishlist whenever any
//! of them may have changed. When a user is present and the snapshot
//! differs from the last one it saw, each non-empty collection is pushed to
//! its sync endpoint in a spawned task. Local state is never rolled back:
//! a failed push is logged and reported, nothing more.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

use atelier_core::{CartItem, SessionUser, UserId, WishlistItem};

use crate::api::{ApiClient, ClientError};

/// Upper bound on a single retry delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How local and server collections are combined before a push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Push local state as-is; the server copy is overwritten.
    #[default]
    LocalWins,
    /// Keep local entries and append server entries whose id isn't local.
    Union,
}

/// Items that can be matched across local and server collections.
pub trait SyncItem: Clone {
    fn sync_id(&self) -> &str;
}

impl SyncItem for CartItem {
    fn sync_id(&self) -> &str {
        &self.id
    }
}

impl SyncItem for WishlistItem {
    fn sync_id(&self) -> &str {
        &self.id
    }
}

/// Combine `local` and `server` according to `strategy`.
///
/// Local entries always win on id conflicts and keep their order.
#[must_use]
pub fn reconcile<T: SyncItem>(local: &[T], server: &[T], strategy: MergeStrategy) -> Vec<T> {
    let mut merged = local.to_vec();
    if strategy == MergeStrategy::Union {
        for item in server {
            if !merged.iter().any(|m| m.sync_id() == item.sync_id()) {
                merged.push(item.clone());
            }
        }
    }
    merged
}

/// Retry schedule for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(250))
    }
}

impl RetryPolicy {
    /// `max_attempts` total tries (at least one), doubling the delay after
    /// each failure starting from `initial_backoff`.
    #[must_use]
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub const fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Run `op` until it succeeds, fails permanently or attempts run out.
    ///
    /// Returns the final result and the number of attempts made.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> (Result<T, ClientError>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::debug!(attempt, ?delay, "Transient sync failure, retrying: {e}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return (result, attempt),
            }
        }
    }
}

/// Result of pushing one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced { items: usize, attempts: u32 },
    Failed { error: String, attempts: u32 },
}

impl SyncOutcome {
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }
}

/// What a sync run did. `None` means that collection wasn't pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub cart: Option<SyncOutcome>,
    pub wishlist: Option<SyncOutcome>,
}

/// Handle to a spawned sync run.
#[derive(Debug)]
pub struct SyncHandle {
    task: JoinHandle<SyncReport>,
}

impl SyncHandle {
    /// Wait for the run to finish.
    ///
    /// A panicked or cancelled task yields an empty report.
    pub async fn join(self) -> SyncReport {
        self.task.await.unwrap_or_else(|e| {
            tracing::error!("Sync task did not complete: {e}");
            SyncReport::default()
        })
    }

    /// Whether the run has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    user: Option<UserId>,
    cart: Vec<CartItem>,
    wishlist: Vec<WishlistItem>,
}

/// Decides when to push local state and spawns the pushes.
#[derive(Debug)]
pub struct SyncCoordinator {
    api: ApiClient,
    strategy: MergeStrategy,
    retry: RetryPolicy,
    last: Option<Snapshot>,
}

impl SyncCoordinator {
    #[must_use]
    pub fn new(api: ApiClient, retry: RetryPolicy) -> Self {
        Self {
            api,
            strategy: MergeStrategy::default(),
            retry,
            last: None,
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Feed the current dependency values.
    ///
    /// Returns a handle when a push was started: a user is present, the
    /// snapshot changed since the last call, and at least one collection is
    /// non-empty. Must be called from within a tokio runtime.
    pub fn observe(
        &mut self,
        user: Option<&SessionUser>,
        cart: &[CartItem],
        wishlist: &[WishlistItem],
    ) -> Option<SyncHandle> {
        let snapshot = Snapshot {
            user: user.map(|u| u.id),
            cart: cart.to_vec(),
            wishlist: wishlist.to_vec(),
        };
        if self.last.as_ref() == Some(&snapshot) {
            return None;
        }
        self.last = Some(snapshot);

        let user = user?;
        if cart.is_empty() && wishlist.is_empty() {
            return None;
        }

        let cart = (!cart.is_empty()).then(|| {
            reconcile(cart, user.cart.as_deref().unwrap_or_default(), self.strategy)
        });
        let wishlist = (!wishlist.is_empty()).then(|| {
            reconcile(
                wishlist,
                user.wishlist.as_deref().unwrap_or_default(),
                self.strategy,
            )
        });

        let api = self.api.clone();
        let retry = self.retry;
        let user_id = user.id;

        tracing::debug!(%user_id, "Starting sync");
        let task = tokio::spawn(async move {
            let mut report = SyncReport::default();

            if let Some(items) = cart {
                let (result, attempts) = retry.run(|| api.sync_cart(&items)).await;
                report.cart = Some(outcome("cart", result.map(|stored| stored.len()), attempts));
            }
            if let Some(items) = wishlist {
                let (result, attempts) = retry.run(|| api.sync_wishlist(&items)).await;
                report.wishlist = Some(outcome(
                    "wishlist",
                    result.map(|stored| stored.len()),
                    attempts,
                ));
            }

            report
        });

        Some(SyncHandle { task })
    }
}

fn outcome(what: &str, result: Result<usize, ClientError>, attempts: u32) -> SyncOutcome {
    match result {
        Ok(items) => {
            tracing::info!(what, items, attempts, "Synced");
            SyncOutcome::Synced { items, attempts }
        }
        Err(e) => {
            tracing::warn!(what, attempts, "Sync failed: {e}");
            SyncOutcome::Failed {
                error: e.to_string(),
                attempts,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        http::StatusCode,
        routing::{get, post},
    };
    use rust_decimal::Decimal;
    use serde_json::{Value, json};

    use atelier_core::Email;

    use super::*;
    use crate::test_support::serve;

    fn cart_item(id: &str, quantity: i64) -> CartItem {
        CartItem {
            id: id.to_owned(),
            name: format!("Item {id}"),
            price: Decimal::from(25),
            quantity,
            image: None,
        }
    }

    fn wishlist_item(id: &str) -> WishlistItem {
        WishlistItem {
            id: id.to_owned(),
            name: format!("Item {id}"),
            price: Decimal::from(80),
            image: None,
        }
    }

    fn user(id: i32) -> SessionUser {
        SessionUser {
            id: UserId::new(id),
            email: Email::parse("ana@example.com").unwrap(),
            first_name: None,
            last_name: None,
            cart: Some(vec![cart_item("server-only", 1)]),
            wishlist: None,
            profile_photo: None,
        }
    }

    type Recorded = Arc<Mutex<Vec<(String, Value)>>>;

    /// Mock API that records every sync body it receives.
    async fn recording_api() -> (ApiClient, Recorded) {
        let recorded: Recorded = Arc::default();
        let cart_log = recorded.clone();
        let wishlist_log = recorded.clone();

        let app = Router::new()
            .route("/api/csrf-token", get(|| async { Json(json!({ "csrfToken": "t" })) }))
            .route(
                "/api/users/sync-cart",
                post(move |Json(body): Json<Value>| {
                    let log = cart_log.clone();
                    async move {
                        log.lock().unwrap().push(("cart".to_string(), body.clone()));
                        Json(json!({ "message": "Cart synced", "cartItems": body["cartItems"] }))
                    }
                }),
            )
            .route(
                "/api/users/sync-wishlist",
                post(move |Json(body): Json<Value>| {
                    let log = wishlist_log.clone();
                    async move {
                        log.lock().unwrap().push(("wishlist".to_string(), body.clone()));
                        Json(json!({ "message": "Wishlist synced", "wishlistItems": body["wishlistItems"] }))
                    }
                }),
            );

        (ApiClient::new(serve(app).await).unwrap(), recorded)
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[test]
    fn test_reconcile_local_wins_ignores_server() {
        let local = vec![cart_item("p1", 2)];
        let server = vec![cart_item("p1", 9), cart_item("p2", 1)];
        assert_eq!(reconcile(&local, &server, MergeStrategy::LocalWins), local);
    }

    #[test]
    fn test_reconcile_union_appends_server_only() {
        let local = vec![cart_item("p1", 2)];
        let server = vec![cart_item("p1", 9), cart_item("p2", 1)];

        let merged = reconcile(&local, &server, MergeStrategy::Union);
        assert_eq!(merged, vec![cart_item("p1", 2), cart_item("p2", 1)]);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(4), Duration::from_millis(800));
        assert_eq!(policy.backoff(40), MAX_BACKOFF);
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_run_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let (result, attempts) = fast_retry()
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ClientError::Api {
                            status: 503,
                            message: "busy".to_string(),
                        })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let (result, attempts) = fast_retry()
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<(), _>(ClientError::Api {
                        status: 401,
                        message: "Not authenticated".to_string(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_user_no_push() {
        let (api, recorded) = recording_api().await;
        let mut sync = SyncCoordinator::new(api, fast_retry());

        assert!(sync.observe(None, &[cart_item("p1", 1)], &[]).is_none());
        assert!(recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_pushes_each_non_empty_collection_once() {
        let (api, recorded) = recording_api().await;
        let mut sync = SyncCoordinator::new(api, fast_retry());
        let cart = vec![cart_item("p1", 2), cart_item("p2", 1)];
        let wishlist = vec![wishlist_item("w1")];

        assert!(sync.observe(None, &cart, &wishlist).is_none());

        let user = user(4);
        let report = sync
            .observe(Some(&user), &cart, &wishlist)
            .unwrap()
            .join()
            .await;

        assert_eq!(report.cart, Some(SyncOutcome::Synced { items: 2, attempts: 1 }));
        assert_eq!(report.wishlist, Some(SyncOutcome::Synced { items: 1, attempts: 1 }));

        // Unchanged snapshot
        assert!(sync.observe(Some(&user), &cart, &wishlist).is_none());

        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].0, "cart");
        assert_eq!(recorded[0].1["cartItems"].as_array().unwrap().len(), 2);
        assert_eq!(recorded[1].0, "wishlist");
        assert_eq!(recorded[1].1["wishlistItems"][0]["id"], "w1");
    }

    #[tokio::test]
    async fn test_change_after_login_pushes_again() {
        let (api, recorded) = recording_api().await;
        let mut sync = SyncCoordinator::new(api, fast_retry());
        let user = user(4);

        sync.observe(Some(&user), &[cart_item("p1", 1)], &[])
            .unwrap()
            .join()
            .await;
        let report = sync
            .observe(Some(&user), &[cart_item("p1", 2)], &[])
            .unwrap()
            .join()
            .await;

        assert!(report.wishlist.is_none());
        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[1].1["cartItems"][0]["quantity"], 2);
    }

    #[tokio::test]
    async fn test_empty_collections_are_not_pushed() {
        let (api, recorded) = recording_api().await;
        let mut sync = SyncCoordinator::new(api, fast_retry());

        assert!(sync.observe(Some(&user(4)), &[], &[]).is_none());
        assert!(recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_union_strategy_includes_server_cart() {
        let (api, recorded) = recording_api().await;
        let mut sync =
            SyncCoordinator::new(api, fast_retry()).with_strategy(MergeStrategy::Union);

        let report = sync
            .observe(Some(&user(4)), &[cart_item("p1", 1)], &[])
            .unwrap()
            .join()
            .await;

        assert_eq!(report.cart, Some(SyncOutcome::Synced { items: 2, attempts: 1 }));
        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded[0].1["cartItems"][1]["id"], "server-only");
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_and_reported() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let app = Router::new()
            .route("/api/csrf-token", get(|| async { Json(json!({ "csrfToken": "t" })) }))
            .route(
                "/api/users/sync-cart",
                post(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "message": "busy" })))
                    }
                }),
            );
        let api = ApiClient::new(serve(app).await).unwrap();
        let mut sync = SyncCoordinator::new(api, fast_retry());
        let cart = vec![cart_item("p1", 1)];

        let report = sync.observe(Some(&user(4)), &cart, &[]).unwrap().join().await;

        assert!(matches!(
            report.cart,
            Some(SyncOutcome::Failed { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Local input untouched
        assert_eq!(cart, vec![cart_item("p1", 1)]);
    }
}
