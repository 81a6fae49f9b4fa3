//! Authentication state for the current visitor.
//!
//! `AuthSession` mirrors the server session: it starts unauthenticated,
//! asks the server who is logged in, and tracks login, registration and
//! logout. Any failure while checking the session simply reads as "nobody
//! is logged in".
//!
//! The state is published on a `watch` channel so a UI can render the
//! `Checking` phase while the request is in flight.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

use atelier_core::{LoginRequest, ProfileUpdate, RegisterRequest, SessionUser};

use crate::api::{ApiClient, ClientError};

/// Where the visitor goes after logging out.
pub const LOGOUT_REDIRECT: &str = "/";

/// Page navigation hook supplied by the host application.
pub trait Navigator: Send + Sync {
    /// Go to `path`. With `force_reload`, discard any in-memory page state.
    fn navigate(&self, path: &str, force_reload: bool);
}

/// Navigator that only logs, for headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str, force_reload: bool) {
        tracing::info!(path, force_reload, "Navigate");
    }
}

/// Where the session check stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Checking,
    Authenticated(SessionUser),
}

/// Errors surfaced to login and registration forms.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The server refused; the message is suitable for display.
    #[error("{0}")]
    Rejected(String),

    /// The server couldn't be reached.
    #[error("Unable to reach the server")]
    Unavailable(#[source] ClientError),
}

impl From<ClientError> for SessionError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { message, .. } => Self::Rejected(message),
            other => Self::Unavailable(other),
        }
    }
}

/// Client-side view of the server session.
pub struct AuthSession {
    api: ApiClient,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<AuthState>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    #[must_use]
    pub fn new(api: ApiClient, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            api,
            navigator,
            state: watch::Sender::new(AuthState::Unauthenticated),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every state transition, including `Checking`.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// The logged-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<SessionUser> {
        match &*self.state.borrow() {
            AuthState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(*self.state.borrow(), AuthState::Checking)
    }

    fn set_state(&self, state: AuthState) {
        self.state.send_replace(state);
    }

    /// Ask the server who is logged in.
    ///
    /// Network failures and non-success responses both leave the session
    /// unauthenticated.
    #[instrument(skip(self))]
    pub async fn check_session(&self) {
        self.set_state(AuthState::Checking);

        let state = match self.api.current_user().await {
            Ok(user) => AuthState::Authenticated(user),
            Err(e) => {
                tracing::debug!("No active session: {e}");
                AuthState::Unauthenticated
            }
        };
        self.set_state(state);
    }

    /// Log in and adopt the returned user.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rejected` with the server's message when the
    /// credentials are refused.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser, SessionError> {
        let user = self
            .api
            .login(&LoginRequest {
                email: email.to_owned(),
                password: password.to_owned(),
            })
            .await?;

        tracing::info!(user_id = %user.id, "Logged in");
        self.set_state(AuthState::Authenticated(user.clone()));
        Ok(user)
    }

    /// Create an account and adopt the returned user.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rejected` with the server's message when
    /// registration is refused.
    #[instrument(skip_all)]
    pub async fn register(&self, request: &RegisterRequest) -> Result<SessionUser, SessionError> {
        let user = self.api.register(request).await?;

        tracing::info!(user_id = %user.id, "Registered");
        self.set_state(AuthState::Authenticated(user.clone()));
        Ok(user)
    }

    /// End the session.
    ///
    /// The local user is cleared and the host navigates home with a forced
    /// reload whether or not the server call succeeds.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::warn!("Logout request failed: {e}");
        }

        self.set_state(AuthState::Unauthenticated);
        self.navigator.navigate(LOGOUT_REDIRECT, true);
    }

    /// Re-read the user from the server.
    pub async fn refresh_user(&self) {
        self.check_session().await;
    }

    /// Update profile fields, then refresh the user.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the update is refused or the server is
    /// unreachable; the current user is left as it was.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), SessionError> {
        self.api.update_profile(update).await?;
        self.refresh_user().await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use axum::{
        Json, Router,
        http::StatusCode,
        routing::{get, patch, post},
    };
    use serde_json::json;
    use tokio::sync::Notify;

    use atelier_core::{Email, UserId};

    use super::*;
    use crate::test_support::{closed_port_url, serve};

    #[derive(Default)]
    struct RecordingNavigator {
        visits: Mutex<Vec<(String, bool)>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, path: &str, force_reload: bool) {
            self.visits
                .lock()
                .unwrap()
                .push((path.to_owned(), force_reload));
        }
    }

    fn user_json() -> serde_json::Value {
        json!({ "id": 4, "email": "ana@example.com", "firstName": "Ana" })
    }

    async fn session_for(app: Router) -> (AuthSession, Arc<RecordingNavigator>) {
        let navigator = Arc::new(RecordingNavigator::default());
        let api = ApiClient::new(serve(app).await).unwrap();
        (AuthSession::new(api, navigator.clone()), navigator)
    }

    #[tokio::test]
    async fn test_check_session_authenticates() {
        let app = Router::new().route(
            "/api/users/me",
            get(|| async { Json(json!({ "user": user_json() })) }),
        );
        let (session, _) = session_for(app).await;

        assert_eq!(session.state(), AuthState::Unauthenticated);
        session.check_session().await;

        assert_eq!(session.user().unwrap().id, UserId::new(4));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_checking_is_visible_while_request_is_pending() {
        let release = Arc::new(Notify::new());
        let gate = release.clone();
        let app = Router::new().route(
            "/api/users/me",
            get(move || {
                let gate = gate.clone();
                async move {
                    gate.notified().await;
                    Json(json!({ "user": user_json() }))
                }
            }),
        );
        let (session, _) = session_for(app).await;
        let mut states = session.subscribe();

        let observer = async {
            states.changed().await.unwrap();
            let seen = states.borrow_and_update().clone();
            let loading = session.is_loading();
            release.notify_one();
            (seen, loading)
        };
        let ((), (seen, loading)) = tokio::join!(session.check_session(), observer);

        assert_eq!(seen, AuthState::Checking);
        assert!(loading);
        assert!(!session.is_loading());
        assert_eq!(session.user().unwrap().id, UserId::new(4));
    }

    #[tokio::test]
    async fn test_check_session_failure_reads_as_logged_out() {
        let app = Router::new().route(
            "/api/users/me",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let (session, _) = session_for(app).await;
        session.check_session().await;
        assert_eq!(session.state(), AuthState::Unauthenticated);

        let api = ApiClient::new(closed_port_url().await).unwrap();
        let offline = AuthSession::new(api, Arc::new(LogNavigator));
        offline.check_session().await;
        assert_eq!(offline.state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_rejection_carries_server_message() {
        let app = Router::new().route(
            "/api/users/login",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "Invalid email or password" })),
                )
            }),
        );
        let (session, _) = session_for(app).await;

        let err = session.login("ana@example.com", "nope-nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_register_sets_user() {
        let app = Router::new().route(
            "/api/users",
            post(|| async { (StatusCode::CREATED, Json(json!({ "user": user_json() }))) }),
        );
        let (session, _) = session_for(app).await;

        let user = session
            .register(&RegisterRequest {
                email: "ana@example.com".to_string(),
                password: "long enough".to_string(),
                first_name: Some("Ana".to_string()),
                last_name: None,
            })
            .await
            .unwrap();

        assert_eq!(user.first_name.as_deref(), Some("Ana"));
        assert_eq!(session.user(), Some(user));
    }

    #[tokio::test]
    async fn test_logout_with_network_down_still_clears_and_navigates() {
        let navigator = Arc::new(RecordingNavigator::default());
        let api = ApiClient::new(closed_port_url().await).unwrap();
        let session = AuthSession::new(api, navigator.clone());
        session.set_state(AuthState::Authenticated(SessionUser {
            id: UserId::new(4),
            email: Email::parse("ana@example.com").unwrap(),
            first_name: None,
            last_name: None,
            cart: None,
            wishlist: None,
            profile_photo: None,
        }));

        session.logout().await;

        assert!(session.user().is_none());
        assert_eq!(
            *navigator.visits.lock().unwrap(),
            vec![("/".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn test_update_profile_refreshes_user() {
        let app = Router::new()
            .route("/api/csrf-token", get(|| async { Json(json!({ "csrfToken": "t" })) }))
            .route(
                "/api/users/me",
                patch(|| async { Json(json!({ "user": user_json() })) }).get(|| async {
                    Json(json!({ "user": { "id": 4, "email": "ana@example.com", "firstName": "Anastasia" } }))
                }),
            );
        let (session, _) = session_for(app).await;

        session
            .update_profile(&ProfileUpdate {
                first_name: Some("Anastasia".to_string()),
                ..ProfileUpdate::default()
            })
            .await
            .unwrap();

        assert_eq!(
            session.user().unwrap().first_name.as_deref(),
            Some("Anastasia")
        );
    }
}
