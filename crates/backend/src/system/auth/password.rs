//! Salted password hashing.
//!
//! Credentials are persisted as `base64(salt) + "$" + base64(derived key)`
//! with a fresh 16-byte salt per call and a PBKDF2-HMAC-SHA256 derived key.
//! Verification fails closed: any malformed stored value compares as a
//! mismatch instead of an error.

use base64::{engine::general_purpose, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::error::BookingError;
use crate::shared::config::AuthConfig;

const SALT_LEN: usize = 16;
const MIN_PASSWORD_LEN: usize = 8;

/// PBKDF2 work parameters. Defaults match the persisted credential format:
/// 65 536 iterations, 256-bit key.
#[derive(Debug, Clone, Copy)]
pub struct HashParams {
    pub iterations: u32,
    /// Derived key length in bytes.
    pub key_len: usize,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            iterations: 65_536,
            key_len: 32,
        }
    }
}

impl HashParams {
    /// Work parameters from the `[auth]` configuration section.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            iterations: config.pbkdf2_iterations,
            key_len: config.pbkdf2_key_len,
        }
    }
}

/// Hash a raw password with a fresh random salt. Two calls on the same
/// password produce different encodings.
pub fn hash_password(raw: &str, params: &HashParams) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let key = derive_key(raw, &salt, params);
    format!(
        "{}${}",
        general_purpose::STANDARD.encode(salt),
        general_purpose::STANDARD.encode(key)
    )
}

/// Check a raw password against a stored `salt$hash` value. Returns false
/// for any malformed input: wrong segment count, undecodable base64.
pub fn verify_password(raw: &str, encoded: &str, params: &HashParams) -> bool {
    let mut parts = encoded.split('$');
    let (salt_b64, hash_b64) = match (parts.next(), parts.next(), parts.next()) {
        (Some(salt), Some(hash), None) => (salt, hash),
        _ => return false,
    };

    let salt = match general_purpose::STANDARD.decode(salt_b64) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let stored = match general_purpose::STANDARD.decode(hash_b64) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let candidate = derive_key(raw, &salt, params);
    slow_equals(&stored, &candidate)
}

/// Minimal strength gate applied at registration and password changes.
pub fn validate_password_strength(raw: &str) -> Result<(), BookingError> {
    if raw.len() < MIN_PASSWORD_LEN {
        return Err(BookingError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn derive_key(raw: &str, salt: &[u8], params: &HashParams) -> Vec<u8> {
    let mut key = vec![0u8; params.key_len];
    pbkdf2_hmac::<Sha256>(raw.as_bytes(), salt, params.iterations, &mut key);
    key
}

/// Constant-time comparison: examines as many bytes as the longer input,
/// XOR-accumulating differences and folding in the length difference, so
/// the running time does not depend on where the first mismatch sits.
fn slow_equals(a: &[u8], b: &[u8]) -> bool {
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= (x ^ y) as usize;
    }
    diff == 0
}
