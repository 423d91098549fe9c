//! The session envelope: a small expiring record sealed under a symmetric
//! key, with no header or signature part.
//!
//! On the wire a session is `base64url(nonce(12) || ciphertext)`, where the
//! plaintext is the base64url encoded JSON record. The record stores `exp`
//! in whole epoch seconds; in memory it is epoch milliseconds, like every
//! other timestamp in this workspace.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use passkey_encode::{base64url, utf8};

use crate::provider::{self, SymmetricKey};

/// Length of the random AEAD nonce prefixed to the ciphertext.
const NONCE_LENGTH: usize = 12;

/// An authenticated session record. `exp` is epoch milliseconds. Any claims
/// beyond the subject and expiry ride along unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The subject (user id) the session was issued to.
    pub sub: String,
    /// Expiry, milliseconds since the unix epoch.
    pub exp: u64,
    /// Additional claims carried verbatim.
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

/// Why a session envelope failed to open.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// AEAD authentication failed, or the envelope is too short to hold a
    /// nonce. Tampering and a wrong key look the same.
    #[error("session could not be decrypted")]
    DecryptionFailed,

    /// The session decrypted but its expiry has passed.
    #[error("session has expired")]
    Expired,

    /// The envelope or the recovered record was not decodable.
    #[error("session could not be parsed")]
    CantParse,
}

/// Seal a session under `key`.
pub fn encrypt(session: &Session, key: &SymmetricKey) -> Result<String, SessionError> {
    let mut record = session.claims.clone();
    record.insert("sub".to_string(), Value::String(session.sub.clone()));
    record.insert("exp".to_string(), Value::from(session.exp / 1000));

    let plaintext = base64url::encode_json(&record).map_err(|_| SessionError::CantParse)?;

    let nonce = provider::random_bytes(NONCE_LENGTH);
    let ciphertext = provider::aead_seal(key, &nonce, plaintext.as_bytes())
        .ok_or(SessionError::DecryptionFailed)?;

    let mut combined = nonce;
    combined.extend_from_slice(&ciphertext);
    Ok(base64url::encode(combined))
}

/// Open a session envelope, authenticating and checking expiry.
pub fn decrypt(envelope: &str, key: &SymmetricKey) -> Result<Session, SessionError> {
    let combined = base64url::decode(envelope).map_err(|_| SessionError::CantParse)?;
    if combined.len() <= NONCE_LENGTH {
        return Err(SessionError::DecryptionFailed);
    }
    let (nonce, ciphertext) = combined.split_at(NONCE_LENGTH);

    let plaintext = provider::aead_open(key, nonce, ciphertext).ok_or_else(|| {
        debug!("session envelope failed aead authentication");
        SessionError::DecryptionFailed
    })?;
    let plaintext = utf8::decode(plaintext).map_err(|_| SessionError::CantParse)?;

    let mut session: Session =
        base64url::decode_json(&plaintext).map_err(|_| SessionError::CantParse)?;
    session.exp *= 1000;

    if session.exp <= provider::now_millis() {
        return Err(SessionError::Expired);
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::provider::generate_symmetric_key;
    use serde_json::json;

    fn session(exp: u64) -> Session {
        let mut claims = Map::new();
        claims.insert("adm".to_string(), json!(true));
        Session {
            sub: "user-1".to_string(),
            exp,
            claims,
        }
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = generate_symmetric_key();
        let exp = provider::now_millis() + 60_000;
        let envelope = encrypt(&session(exp), &key).unwrap();

        let recovered = decrypt(&envelope, &key).unwrap();
        assert_eq!(recovered.sub, "user-1");
        assert_eq!(recovered.claims.get("adm"), Some(&json!(true)));
        // Expiry survives, at second granularity.
        assert_eq!(recovered.exp, exp / 1000 * 1000);
    }

    #[test]
    fn decrypt_rejects_wrong_key_and_tampering() {
        let key = generate_symmetric_key();
        let envelope = encrypt(&session(provider::now_millis() + 60_000), &key).unwrap();

        assert_eq!(
            decrypt(&envelope, &generate_symmetric_key()),
            Err(SessionError::DecryptionFailed)
        );

        let mut bytes = base64url::decode(&envelope).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert_eq!(
            decrypt(&base64url::encode(bytes), &key),
            Err(SessionError::DecryptionFailed)
        );
    }

    #[test]
    fn decrypt_rejects_expired() {
        let key = generate_symmetric_key();
        let envelope = encrypt(&session(provider::now_millis() - 1), &key).unwrap();
        assert_eq!(decrypt(&envelope, &key), Err(SessionError::Expired));
    }

    #[test]
    fn decrypt_rejects_garbage() {
        let key = generate_symmetric_key();
        assert_eq!(
            decrypt("!!! not base64 !!!", &key),
            Err(SessionError::CantParse)
        );
        // Valid base64, too short to contain a nonce.
        assert_eq!(
            decrypt(&base64url::encode([0u8; 8]), &key),
            Err(SessionError::DecryptionFailed)
        );
    }

    #[test]
    fn envelopes_are_nondeterministic() {
        let key = generate_symmetric_key();
        let record = session(provider::now_millis() + 60_000);
        let a = encrypt(&record, &key).unwrap();
        let b = encrypt(&record, &key).unwrap();
        assert_ne!(a, b);
    }
}
