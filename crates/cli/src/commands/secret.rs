//! Random secret generation.

use rand::RngCore;

/// Hex-encodes to 64 characters.
pub const DEFAULT_SECRET_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
#[error("Secret must be at least 16 bytes, got {0}")]
pub struct SecretLengthError(usize);

/// Hex-encode `bytes` random bytes from the OS-seeded thread RNG.
///
/// # Errors
///
/// Returns `SecretLengthError` below 16 bytes, which would encode shorter
/// than the storefront's 32-character minimum.
pub fn generate(bytes: usize) -> Result<String, SecretLengthError> {
    if bytes < 16 {
        return Err(SecretLengthError(bytes));
    }
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    Ok(hex::encode(buf))
}
