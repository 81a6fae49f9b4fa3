//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `ATELIER_API_BASE_URL` - Storefront API origin (default: `http://127.0.0.1:3000`)
//! - `ATELIER_STORAGE_DIR` - Directory for persisted cart/wishlist (default: `.atelier`)
//! - `ATELIER_SYNC_MAX_ATTEMPTS` - Attempts per sync push (default: 3)
//! - `ATELIER_SYNC_BACKOFF_MS` - Initial retry delay in milliseconds (default: 250)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::sync::RetryPolicy;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_STORAGE_DIR: &str = ".atelier";
const DEFAULT_SYNC_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_SYNC_BACKOFF_MS: u64 = 250;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin of the storefront API
    pub api_base_url: Url,
    /// Where `FileStorage` keeps its files
    pub storage_dir: PathBuf,
    /// Retry behaviour for cart/wishlist sync pushes
    pub sync_retry: RetryPolicy,
}

impl ClientConfig {
    /// Defaults pointed at `api_base_url`.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            sync_retry: RetryPolicy::new(
                DEFAULT_SYNC_MAX_ATTEMPTS,
                Duration::from_millis(DEFAULT_SYNC_BACKOFF_MS),
            ),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but can't be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but can't be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_base_url = get("ATELIER_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = Url::parse(&api_base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("ATELIER_API_BASE_URL".to_string(), e.to_string())
        })?;
        if !matches!(api_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "ATELIER_API_BASE_URL".to_string(),
                "must be an http(s) URL".to_string(),
            ));
        }

        let max_attempts = match get("ATELIER_SYNC_MAX_ATTEMPTS") {
            Some(v) => v
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| {
                    ConfigError::InvalidEnvVar(
                        "ATELIER_SYNC_MAX_ATTEMPTS".to_string(),
                        format!("expected a positive integer, got {v:?}"),
                    )
                })?,
            None => DEFAULT_SYNC_MAX_ATTEMPTS,
        };

        let backoff_ms = match get("ATELIER_SYNC_BACKOFF_MS") {
            Some(v) => v.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("ATELIER_SYNC_BACKOFF_MS".to_string(), e.to_string())
            })?,
            None => DEFAULT_SYNC_BACKOFF_MS,
        };

        Ok(Self {
            api_base_url,
            storage_dir: get("ATELIER_STORAGE_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR), PathBuf::from),
            sync_retry: RetryPolicy::new(max_attempts, Duration::from_millis(backoff_ms)),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api_base_url.as_str(), "http://127.0.0.1:3000/");
        assert_eq!(config.storage_dir, PathBuf::from(".atelier"));
        assert_eq!(config.sync_retry.max_attempts(), 3);
        assert_eq!(config.sync_retry.initial_backoff(), Duration::from_millis(250));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("ATELIER_API_BASE_URL", "https://shop.example.com"),
            ("ATELIER_STORAGE_DIR", "/tmp/atelier"),
            ("ATELIER_SYNC_MAX_ATTEMPTS", "5"),
            ("ATELIER_SYNC_BACKOFF_MS", "10"),
        ])
        .unwrap();

        assert_eq!(config.api_base_url.host_str(), Some("shop.example.com"));
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/atelier"));
        assert_eq!(config.sync_retry.max_attempts(), 5);
        assert_eq!(config.sync_retry.initial_backoff(), Duration::from_millis(10));
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let config = config_from(&[("ATELIER_SYNC_MAX_ATTEMPTS", "  ")]).unwrap();
        assert_eq!(config.sync_retry.max_attempts(), 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config_from(&[("ATELIER_API_BASE_URL", "not a url")]).is_err());
        assert!(config_from(&[("ATELIER_API_BASE_URL", "ftp://files.example.com")]).is_err());
        assert!(config_from(&[("ATELIER_SYNC_MAX_ATTEMPTS", "0")]).is_err());
        assert!(config_from(&[("ATELIER_SYNC_BACKOFF_MS", "-1")]).is_err());
    }
}
