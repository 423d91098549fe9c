//! Salted password hashing and comparison.
//!
//! A stored hash is `base64url(salt(16) || derived(32))`, with the derived
//! part produced by PBKDF2-HMAC-SHA256. Compare re-derives under the stored
//! salt, so two hashes of the same password never match each other but both
//! match the password.

use passkey_encode::base64url;

use crate::provider;

/// Length of the random salt prefixed to each stored hash.
pub const SALT_LENGTH: usize = 16;

/// Length of the derived portion of a stored hash.
const DERIVED_LENGTH: usize = 32;

/// PBKDF2 iteration count for password hashing.
pub const ITERATIONS: u32 = 100_000;

/// Hash a password under a fresh random salt.
pub fn hash(plaintext: &str) -> String {
    let salt = provider::random_bytes(SALT_LENGTH);
    derive(plaintext, &salt)
}

/// Check a password against a stored hash. A malformed stored hash simply
/// does not match.
pub fn compare(plaintext: &str, stored: &str) -> bool {
    let Ok(combined) = base64url::decode(stored) else {
        return false;
    };
    if combined.len() != SALT_LENGTH + DERIVED_LENGTH {
        return false;
    }
    derive(plaintext, &combined[..SALT_LENGTH]) == stored
}

fn derive(plaintext: &str, salt: &[u8]) -> String {
    let mut derived = [0u8; DERIVED_LENGTH];
    provider::derive_bits(plaintext.as_bytes(), salt, ITERATIONS, &mut derived);

    let mut combined = Vec::with_capacity(SALT_LENGTH + DERIVED_LENGTH);
    combined.extend_from_slice(salt);
    combined.extend_from_slice(&derived);
    base64url::encode(combined)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn same_password_hashes_differently() {
        let a = hash("correct horse battery staple");
        let b = hash("correct horse battery staple");
        assert_ne!(a, b);
        assert!(compare("correct horse battery staple", &a));
        assert!(compare("correct horse battery staple", &b));
    }

    #[test]
    fn compare_rejects_wrong_password() {
        let stored = hash("correct horse battery staple");
        assert!(!compare("incorrect horse", &stored));
        assert!(!compare("", &stored));
    }

    #[test]
    fn compare_rejects_malformed_hash() {
        assert!(!compare("pw", ""));
        assert!(!compare("pw", "!!! not base64 !!!"));
        assert!(!compare("pw", &base64url::encode([0u8; 8])));
    }
}
