//! API key generation and verification.
//!
//! Keys are `mk_` followed by 24 random characters drawn from uppercase
//! letters and digits. Only the SHA-256 digest and a short display prefix are
//! ever persisted; the raw key is surfaced exactly once at generation time.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fixed prefix for all API keys.
pub const API_KEY_PREFIX: &str = "mk_";

/// Length of the random suffix.
pub const API_KEY_SUFFIX_LEN: usize = 24;

/// Number of leading characters kept for display (`mk_XXXXX`).
pub const API_KEY_DISPLAY_LEN: usize = 8;

const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// The stored form of an API key.
///
/// Holds everything needed to verify and display a key without being able to
/// reconstruct it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// Leading characters of the key, for display in the UI.
    pub display_prefix: String,

    /// Hex-encoded SHA-256 digest of the full key.
    pub digest: String,

    /// Whether the key is currently accepted.
    pub active: bool,

    /// When the key was generated.
    pub created_at: DateTime<Utc>,
}

impl ApiKeyRecord {
    /// Generate a fresh key, returning the raw key and its stored record.
    ///
    /// The raw key is not retained anywhere; the caller must hand it to the
    /// user in the same response.
    #[must_use]
    pub fn generate() -> (String, Self) {
        let mut rng = rand::rng();
        let suffix: String = (0..API_KEY_SUFFIX_LEN)
            .map(|_| {
                let idx = rng.random_range(0..SUFFIX_CHARSET.len());
                SUFFIX_CHARSET[idx] as char
            })
            .collect();
        let raw = format!("{API_KEY_PREFIX}{suffix}");

        let record = Self {
            display_prefix: raw[..API_KEY_DISPLAY_LEN].to_string(),
            digest: digest_hex(&raw),
            active: true,
            created_at: Utc::now(),
        };
        (raw, record)
    }

    /// Check a presented key against the stored digest.
    ///
    /// Inactive keys never verify. Comparison is constant time over the
    /// hex digests.
    #[must_use]
    pub fn verify(&self, presented: &str) -> bool {
        if !self.active {
            return false;
        }
        constant_time_eq(&digest_hex(presented), &self.digest)
    }
}

/// Hex-encoded SHA-256 digest of a key string.
#[must_use]
pub fn digest_hex(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time string comparison to prevent timing attacks.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_matches_format() {
        let (raw, record) = ApiKeyRecord::generate();

        assert!(raw.starts_with(API_KEY_PREFIX));
        assert_eq!(raw.len(), API_KEY_PREFIX.len() + API_KEY_SUFFIX_LEN);
        assert!(raw[API_KEY_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_eq!(record.display_prefix, &raw[..API_KEY_DISPLAY_LEN]);
        assert!(record.active);
    }

    #[test]
    fn record_stores_digest_not_key() {
        let (raw, record) = ApiKeyRecord::generate();

        assert_ne!(record.digest, raw);
        assert_eq!(record.digest.len(), 64); // SHA-256 = 32 bytes = 64 hex chars
        assert_eq!(record.digest, digest_hex(&raw));
    }

    #[test]
    fn verify_accepts_the_generated_key_only() {
        let (raw, record) = ApiKeyRecord::generate();

        assert!(record.verify(&raw));
        assert!(!record.verify("mk_AAAAAAAAAAAAAAAAAAAAAAAA"));
        assert!(!record.verify(""));
    }

    #[test]
    fn inactive_key_never_verifies() {
        let (raw, mut record) = ApiKeyRecord::generate();
        record.active = false;

        assert!(!record.verify(&raw));
    }

    #[test]
    fn keys_are_unique() {
        let (a, _) = ApiKeyRecord::generate();
        let (b, _) = ApiKeyRecord::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
    }
}
