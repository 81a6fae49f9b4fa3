//! Storefront API client.
//!
//! Wraps `reqwest` with a cookie jar so the session cookie set by login is
//! sent on later calls, and fetches a CSRF token before any call to a
//! CSRF-protected endpoint.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use atelier_core::{
    CartItem, CartSync, CustomOrder, CustomOrderError, CustomOrderRequest, LoginRequest,
    ProfileUpdate, RegisterRequest, SessionUser, WishlistItem, WishlistSync,
};

/// Header carrying the CSRF token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Tokens are valid for an hour server-side; refresh well before that.
const CSRF_TOKEN_REUSE: Duration = Duration::from_secs(50 * 60);

/// Errors from the storefront API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connect, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Endpoint path didn't join onto the base URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Request rejected locally before sending.
    #[error("invalid request: {0}")]
    Invalid(#[from] CustomOrderError),
}

impl ClientError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport errors and 5xx responses are transient; everything else is
    /// a definitive answer.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_decode() && !e.is_builder(),
            Self::Api { status, .. } => *status >= 500,
            Self::Url(_) | Self::Invalid(_) => false,
        }
    }

    /// HTTP status of an API error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: SessionUser,
}

#[derive(Deserialize)]
struct OrderEnvelope {
    order: CustomOrder,
}

#[derive(Deserialize)]
struct OrdersEnvelope {
    orders: Vec<CustomOrder>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsrfEnvelope {
    csrf_token: String,
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

/// Client for the storefront API.
///
/// Cheap to clone; clones share the cookie jar and the cached CSRF token.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    csrf: Mutex<Option<(String, Instant)>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url,
                csrf: Mutex::new(None),
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// `GET /api/users/me`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 401 when there is no session.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<SessionUser, ClientError> {
        let response = self.request(Method::GET, "/api/users/me")?.send().await?;
        let envelope: UserEnvelope = parse(response, "Not authenticated").await?;
        Ok(envelope.user)
    }

    /// `POST /api/users/login`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` carrying the server's message on rejection.
    #[instrument(skip_all)]
    pub async fn login(&self, credentials: &LoginRequest) -> Result<SessionUser, ClientError> {
        let response = self
            .request(Method::POST, "/api/users/login")?
            .json(credentials)
            .send()
            .await?;
        let envelope: UserEnvelope = parse(response, "Login failed").await?;
        Ok(envelope.user)
    }

    /// `POST /api/users`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` carrying the server's message on rejection.
    #[instrument(skip_all)]
    pub async fn register(&self, request: &RegisterRequest) -> Result<SessionUser, ClientError> {
        let response = self
            .request(Method::POST, "/api/users")?
            .json(request)
            .send()
            .await?;
        let envelope: UserEnvelope = parse(response, "Registration failed").await?;
        Ok(envelope.user)
    }

    /// `POST /api/users/logout`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self
            .request(Method::POST, "/api/users/logout")?
            .send()
            .await?;
        let _: MessageBody = parse(response, "Logout failed").await?;
        self.forget_csrf_token();
        Ok(())
    }

    /// `GET /api/csrf-token`, reusing a recent token when one is cached.
    ///
    /// # Errors
    ///
    /// Returns error if a fresh token is needed and the request fails.
    pub async fn csrf_token(&self) -> Result<String, ClientError> {
        if let Some(token) = self.cached_csrf_token() {
            return Ok(token);
        }

        let response = self.request(Method::GET, "/api/csrf-token")?.send().await?;
        let envelope: CsrfEnvelope = parse(response, "Failed to fetch CSRF token").await?;

        *self
            .inner
            .csrf
            .lock()
            .unwrap_or_else(PoisonError::into_inner) =
            Some((envelope.csrf_token.clone(), Instant::now()));

        Ok(envelope.csrf_token)
    }

    /// `POST /api/users/sync-cart`. Returns what the server stored.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or is rejected.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn sync_cart(&self, items: &[CartItem]) -> Result<Vec<CartItem>, ClientError> {
        let body = CartSync {
            cart_items: items.to_vec(),
        };
        let stored: CartSync = self
            .send_protected(Method::POST, "/api/users/sync-cart", &body, "Cart sync failed")
            .await?;
        Ok(stored.cart_items)
    }

    /// `POST /api/users/sync-wishlist`. Returns what the server stored.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or is rejected.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn sync_wishlist(
        &self,
        items: &[WishlistItem],
    ) -> Result<Vec<WishlistItem>, ClientError> {
        let body = WishlistSync {
            wishlist_items: items.to_vec(),
        };
        let stored: WishlistSync = self
            .send_protected(
                Method::POST,
                "/api/users/sync-wishlist",
                &body,
                "Wishlist sync failed",
            )
            .await?;
        Ok(stored.wishlist_items)
    }

    /// `PATCH /api/users/me`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or is rejected.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<SessionUser, ClientError> {
        let envelope: UserEnvelope = self
            .send_protected(Method::PATCH, "/api/users/me", update, "Profile update failed")
            .await?;
        Ok(envelope.user)
    }

    /// `POST /api/custom-orders`.
    ///
    /// The request is validated locally first; an invalid request never
    /// reaches the network.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Invalid` for local validation failures, or an
    /// API error if the server rejects the order.
    #[instrument(skip_all, fields(product_id = %request.product_id))]
    pub async fn submit_custom_order(
        &self,
        request: &CustomOrderRequest,
    ) -> Result<CustomOrder, ClientError> {
        request.validate()?;

        let envelope: OrderEnvelope = self
            .send_protected(
                Method::POST,
                "/api/custom-orders",
                request,
                "Order submission failed",
            )
            .await?;
        Ok(envelope.order)
    }

    /// `GET /api/custom-orders`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or is rejected.
    #[instrument(skip(self))]
    pub async fn custom_orders(&self) -> Result<Vec<CustomOrder>, ClientError> {
        let response = self
            .request(Method::GET, "/api/custom-orders")?
            .send()
            .await?;
        let envelope: OrdersEnvelope = parse(response, "Failed to load orders").await?;
        Ok(envelope.orders)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self.inner.base_url.join(path)?;
        Ok(self.inner.http.request(method, url))
    }

    /// Send a JSON body to a CSRF-protected endpoint.
    ///
    /// A 403 means the cached token went stale; it is dropped and the call
    /// is retried once with a fresh one.
    async fn send_protected<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<T, ClientError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut retried = false;
        loop {
            let token = self.csrf_token().await?;
            let response = self
                .request(method.clone(), path)?
                .header(CSRF_HEADER, token)
                .json(body)
                .send()
                .await?;

            if response.status() == StatusCode::FORBIDDEN && !retried {
                tracing::debug!(path, "CSRF token rejected, refreshing");
                self.forget_csrf_token();
                retried = true;
                continue;
            }

            return parse(response, fallback).await;
        }
    }

    fn cached_csrf_token(&self) -> Option<String> {
        let cached = self
            .inner
            .csrf
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        cached
            .as_ref()
            .filter(|(_, fetched_at)| fetched_at.elapsed() < CSRF_TOKEN_REUSE)
            .map(|(token, _)| token.clone())
    }

    fn forget_csrf_token(&self) {
        *self
            .inner
            .csrf
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Decode a success body, or turn an error response into `ClientError::Api`
/// using the server's `message` (or `fallback` when there is none).
async fn parse<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = response
        .json::<MessageBody>()
        .await
        .map_or_else(|_| fallback.to_string(), |body| body.message);

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
