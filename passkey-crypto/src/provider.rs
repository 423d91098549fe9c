//! Safe operation wrappers over the cryptographic primitive crates.
//!
//! This module is the only place primitive providers are touched, to allow
//! ease of auditing and provider substitution. Everything is exposed as a
//! small total function: operations that can fail for cryptographic reasons
//! return `Option`/`bool` so that failure paths stay branch-testable and
//! side-effect free.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{Aes256Gcm, AesGcm};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use passkey_encode::base64url;

/// AES-256-GCM with the 16 byte nonce the key-wrap envelope uses.
type Aes256GcmIv16 = AesGcm<Aes256, U16>;

/// Length in bytes of a symmetric encryption key.
pub const SYMMETRIC_KEY_LENGTH: usize = 32;

/// Default modulus size for asymmetric encryption key pairs.
pub const RSA_MODULUS_BITS: usize = 4096;

/// A raw AES-256 key. The bytes are deliberately not printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey(pub [u8; SYMMETRIC_KEY_LENGTH]);

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey(..)")
    }
}

/// An opaque key handle, the unit all envelope operations work with.
///
/// Exactly which variants an operation accepts is part of that operation's
/// contract; handing the wrong kind of key to an operation is reported the
/// same way as any other cryptographic failure.
#[derive(Clone)]
pub enum KeyMaterial {
    /// An ECDSA P-256 signing (private) key.
    EcdsaSigning(SigningKey),
    /// An ECDSA P-256 verifying (public) key.
    EcdsaVerifying(VerifyingKey),
    /// An RSA-OAEP decryption (private) key.
    RsaPrivate(RsaPrivateKey),
    /// An RSA-OAEP encryption (public) key.
    RsaPublic(RsaPublicKey),
    /// An AES-256-GCM key.
    Symmetric(SymmetricKey),
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            KeyMaterial::EcdsaSigning(_) => "EcdsaSigning",
            KeyMaterial::EcdsaVerifying(_) => "EcdsaVerifying",
            KeyMaterial::RsaPrivate(_) => "RsaPrivate",
            KeyMaterial::RsaPublic(_) => "RsaPublic",
            KeyMaterial::Symmetric(_) => "Symmetric",
        };
        write!(f, "KeyMaterial::{kind}(..)")
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KeyMaterial::EcdsaSigning(a), KeyMaterial::EcdsaSigning(b)) => {
                a.to_bytes() == b.to_bytes()
            }
            (KeyMaterial::EcdsaVerifying(a), KeyMaterial::EcdsaVerifying(b)) => a == b,
            (KeyMaterial::RsaPrivate(a), KeyMaterial::RsaPrivate(b)) => a == b,
            (KeyMaterial::RsaPublic(a), KeyMaterial::RsaPublic(b)) => a == b,
            (KeyMaterial::Symmetric(a), KeyMaterial::Symmetric(b)) => a == b,
            _ => false,
        }
    }
}

impl KeyMaterial {
    /// The handle as an ECDSA signing key, if it is one.
    pub fn as_ecdsa_signing(&self) -> Option<&SigningKey> {
        match self {
            KeyMaterial::EcdsaSigning(k) => Some(k),
            _ => None,
        }
    }

    /// The handle as an ECDSA verifying key, if it is one.
    pub fn as_ecdsa_verifying(&self) -> Option<&VerifyingKey> {
        match self {
            KeyMaterial::EcdsaVerifying(k) => Some(k),
            _ => None,
        }
    }

    /// The handle as an RSA private key, if it is one.
    pub fn as_rsa_private(&self) -> Option<&RsaPrivateKey> {
        match self {
            KeyMaterial::RsaPrivate(k) => Some(k),
            _ => None,
        }
    }

    /// The handle as an RSA public key, if it is one.
    pub fn as_rsa_public(&self) -> Option<&RsaPublicKey> {
        match self {
            KeyMaterial::RsaPublic(k) => Some(k),
            _ => None,
        }
    }

    /// The handle as a symmetric key, if it is one.
    pub fn as_symmetric(&self) -> Option<&SymmetricKey> {
        match self {
            KeyMaterial::Symmetric(k) => Some(k),
            _ => None,
        }
    }
}

/// Cryptographically secure random bytes.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// A random string of at least `len` base64url characters, truncated to
/// exactly `len`. Used for challenge identifiers.
pub fn random_chars(len: usize) -> String {
    let mut chars = base64url::encode(random_bytes(len));
    chars.truncate(len);
    chars
}

/// A random version 4 UUID.
pub fn random_uuid() -> Uuid {
    Uuid::new_v4()
}

/// SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 digest, base64url encoded.
pub fn sha256_b64(data: &[u8]) -> String {
    base64url::encode(sha256(data))
}

/// PBKDF2-HMAC-SHA256 bit derivation into `out`.
pub fn derive_bits(password: &[u8], salt: &[u8], iterations: u32, out: &mut [u8]) {
    pbkdf2_hmac::<Sha256>(password, salt, iterations, out);
}

/// Derive a 256 bit wrapping key from a password and salt.
pub fn derive_wrapping_key(password: &str, salt: &[u8], iterations: u32) -> SymmetricKey {
    let mut key = [0u8; SYMMETRIC_KEY_LENGTH];
    derive_bits(password.as_bytes(), salt, iterations, &mut key);
    SymmetricKey(key)
}

/// AEAD encrypt `plaintext` under `key` with the supplied nonce. The nonce
/// must be 12 bytes (session envelopes) or 16 bytes (key-wrap envelopes).
pub fn aead_seal(key: &SymmetricKey, nonce: &[u8], plaintext: &[u8]) -> Option<Vec<u8>> {
    match nonce.len() {
        12 => {
            let nonce: [u8; 12] = nonce.try_into().ok()?;
            Aes256Gcm::new(&key.0.into())
                .encrypt(&nonce.into(), plaintext)
                .ok()
        }
        16 => {
            let nonce: [u8; 16] = nonce.try_into().ok()?;
            Aes256GcmIv16::new(&key.0.into())
                .encrypt(&nonce.into(), plaintext)
                .ok()
        }
        _ => None,
    }
}

/// AEAD decrypt and authenticate. `None` covers both a bad nonce length and
/// an authentication failure.
pub fn aead_open(key: &SymmetricKey, nonce: &[u8], ciphertext: &[u8]) -> Option<Vec<u8>> {
    match nonce.len() {
        12 => {
            let nonce: [u8; 12] = nonce.try_into().ok()?;
            Aes256Gcm::new(&key.0.into())
                .decrypt(&nonce.into(), ciphertext)
                .ok()
        }
        16 => {
            let nonce: [u8; 16] = nonce.try_into().ok()?;
            Aes256GcmIv16::new(&key.0.into())
                .decrypt(&nonce.into(), ciphertext)
                .ok()
        }
        _ => None,
    }
}

/// Generate an ECDSA P-256 signing pair.
pub fn generate_signing_keypair() -> (SigningKey, VerifyingKey) {
    let signing = SigningKey::random(&mut OsRng);
    let verifying = VerifyingKey::from(&signing);
    (signing, verifying)
}

/// Generate an RSA-OAEP encryption pair with the given modulus size.
pub fn generate_encryption_keypair(bits: usize) -> Option<(RsaPrivateKey, RsaPublicKey)> {
    let private = RsaPrivateKey::new(&mut OsRng, bits).ok()?;
    let public = RsaPublicKey::from(&private);
    Some((private, public))
}

/// Generate a fresh AES-256 key.
pub fn generate_symmetric_key() -> SymmetricKey {
    let mut key = [0u8; SYMMETRIC_KEY_LENGTH];
    OsRng.fill_bytes(&mut key);
    SymmetricKey(key)
}

/// ECDSA P-256 + SHA-256 signature in the raw 64 byte `r || s` layout.
pub fn ecdsa_sign(key: &SigningKey, data: &[u8]) -> [u8; 64] {
    let signature: Signature = key.sign(data);
    let mut out = [0u8; 64];
    out.copy_from_slice(&signature.to_bytes());
    out
}

/// Verify a raw `r || s` ECDSA P-256 signature.
pub fn ecdsa_verify(key: &VerifyingKey, data: &[u8], signature: &[u8]) -> bool {
    match Signature::from_slice(signature) {
        Ok(signature) => key.verify(data, &signature).is_ok(),
        Err(_) => false,
    }
}

/// RSA-OAEP-SHA256 encrypt.
pub fn rsa_encrypt(key: &RsaPublicKey, data: &[u8]) -> Option<Vec<u8>> {
    key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), data).ok()
}

/// RSA-OAEP-SHA256 decrypt.
pub fn rsa_decrypt(key: &RsaPrivateKey, data: &[u8]) -> Option<Vec<u8>> {
    key.decrypt(Oaep::new::<Sha256>(), data).ok()
}

/// Milliseconds since the unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Seconds since the unix epoch, fractional.
pub fn now_secs() -> f64 {
    now_millis() as f64 / 1000.0
}
