//! Stateless CSRF tokens.
//!
//! A token is `timestamp:nonce:signature` where `timestamp` is milliseconds
//! since the Unix epoch, `nonce` is 16 random bytes (lowercase hex) and
//! `signature` is the lowercase-hex HMAC-SHA256 of `timestamp:nonce` under
//! the server secret. Nothing is stored server-side: validity depends only
//! on the token bytes, the secret and the clock, so any process holding the
//! secret can validate any token.

use hmac::{Hmac, Mac};
use rand::TryRngCore;
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// How long a token stays valid after it is minted, in milliseconds.
pub const TOKEN_TTL_MS: u64 = 60 * 60 * 1000;

/// Name of the request header clients echo the token in.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Number of random bytes in the nonce.
const NONCE_BYTES: usize = 16;

/// Why a token couldn't be minted.
#[derive(Debug, Error)]
pub enum CsrfError {
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    #[error("HMAC key rejected")]
    Key,
}

/// Mints and validates CSRF tokens under a single secret.
#[derive(Clone)]
pub struct CsrfSigner {
    secret: SecretString,
}

impl std::fmt::Debug for CsrfSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfSigner")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl CsrfSigner {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Mint a token stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `CsrfError` if the OS entropy source fails.
    pub fn generate(&self) -> Result<String, CsrfError> {
        self.generate_at(now_ms())
    }

    /// Mint a token stamped with `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns `CsrfError` if the OS entropy source fails.
    pub fn generate_at(&self, now_ms: u64) -> Result<String, CsrfError> {
        let mut nonce = [0u8; NONCE_BYTES];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| CsrfError::Entropy(e.to_string()))?;

        let payload = format!("{now_ms}:{}", hex::encode(nonce));
        let mac = self.mac(&payload).ok_or(CsrfError::Key)?;
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{payload}:{signature}"))
    }

    /// Check a token against the current time.
    #[must_use]
    pub fn validate(&self, token: &str) -> bool {
        self.validate_at(token, now_ms())
    }

    /// Check a token as if the current time were `now_ms`.
    ///
    /// Returns `false` for any malformed, forged or expired token. Tokens
    /// stamped slightly in the future (clock skew between processes) are
    /// treated as age zero.
    #[must_use]
    pub fn validate_at(&self, token: &str, now_ms: u64) -> bool {
        let mut parts = token.split(':');
        let (Some(timestamp), Some(nonce), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };

        if timestamp.is_empty() || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        if !is_lower_hex(nonce) || !is_lower_hex(signature) {
            return false;
        }

        let Ok(signature) = hex::decode(signature) else {
            return false;
        };

        // verify_slice compares in constant time
        let payload = format!("{timestamp}:{nonce}");
        let Some(mac) = self.mac(&payload) else {
            return false;
        };
        if mac.verify_slice(&signature).is_err() {
            return false;
        }

        let Ok(minted_at) = timestamp.parse::<u64>() else {
            return false;
        };

        now_ms.saturating_sub(minted_at) < TOKEN_TTL_MS
    }

    fn mac(&self, payload: &str) -> Option<HmacSha256> {
        let Ok(mut mac) =
            <HmacSha256 as Mac>::new_from_slice(self.secret.expose_secret().as_bytes())
        else {
            tracing::error!("CSRF secret rejected as HMAC key");
            return None;
        };
        mac.update(payload.as_bytes());
        Some(mac)
    }
}

fn is_lower_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
