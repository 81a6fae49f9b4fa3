//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::csrf::CsrfSigner;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    csrf: CsrfSigner,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let csrf = CsrfSigner::new(config.csrf_secret.clone());

        Self {
            inner: Arc::new(AppStateInner { config, pool, csrf }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the CSRF token signer.
    #[must_use]
    pub fn csrf(&self) -> &CsrfSigner {
        &self.inner.csrf
    }
}

/// State backed by a pool that never connects.
///
/// Handlers that reach the database fail with a pool timeout, so tests
/// built on this state only exercise paths that stop before any query.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn test_state() -> AppState {
    use secrecy::ExposeSecret;
    use sqlx::postgres::PgPoolOptions;

    let config = crate::config::test_config();
    let pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_millis(100))
        .connect_lazy(config.database_url.expose_secret())
        .unwrap();

    AppState::new(config, pool)
}
