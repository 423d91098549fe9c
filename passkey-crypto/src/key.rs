//! The key envelope: password wrapping for private keys and tagged JWK
//! export for public keys.
//!
//! A wrapped key is one base64url string over the byte layout
//! `[type tag (1) | salt (16) | iv (16) | wrapped key]`. The exported public
//! form omits salt and iv: `[type tag (1) | JWK bytes]`, with no encryption.
//!
//! Unwrap and import return `None` on *any* failure - a wrong password is
//! deliberately indistinguishable from malformed input.

use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use passkey_encode::base64url;

use crate::provider::{self, KeyMaterial, SymmetricKey, SYMMETRIC_KEY_LENGTH};

/// Length of the random key-derivation salt inside a wrap envelope.
pub const SALT_LENGTH: usize = 16;

/// Length of the random AEAD nonce inside a wrap envelope.
pub const IV_LENGTH: usize = 16;

/// PBKDF2 iteration count for deriving the wrapping key.
pub const WRAP_ITERATIONS: u32 = 100_000;

/// The intended use of an enveloped key, stored as the leading tag byte.
///
///    +---------------+-------+----------------------+
///    | Purpose       | Tag   | Algorithm family     |
///    +---------------+-------+----------------------+
///    | AsymEncrypter | 0     | RSA-OAEP             |
///    | AsymSigner    | 1     | ECDSA P-256          |
///    | SymEncryptor  | 2     | AES-256-GCM          |
///    +---------------+-------+----------------------+
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPurpose {
    /// Asymmetric encryption (RSA-OAEP).
    AsymEncrypter,
    /// Asymmetric signing (ECDSA P-256).
    AsymSigner,
    /// Symmetric encryption (AES-256-GCM).
    SymEncryptor,
}

impl From<KeyPurpose> for u8 {
    fn from(p: KeyPurpose) -> u8 {
        match p {
            KeyPurpose::AsymEncrypter => 0,
            KeyPurpose::AsymSigner => 1,
            KeyPurpose::SymEncryptor => 2,
        }
    }
}

impl TryFrom<u8> for KeyPurpose {
    type Error = ();

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(KeyPurpose::AsymEncrypter),
            1 => Ok(KeyPurpose::AsymSigner),
            2 => Ok(KeyPurpose::SymEncryptor),
            _ => Err(()),
        }
    }
}

/// Wrap a private key under a password.
///
/// The wrapping key is derived with PBKDF2-SHA256 over a fresh random salt,
/// and the serialized key is sealed with AES-256-GCM under a fresh random
/// 16 byte nonce. `None` if the key cannot be serialized (for example a
/// public key handle was supplied).
pub fn wrap(key: &KeyMaterial, password: &str, purpose: KeyPurpose) -> Option<String> {
    let key_bytes = private_key_to_bytes(key)?;

    let salt = provider::random_bytes(SALT_LENGTH);
    let iv = provider::random_bytes(IV_LENGTH);
    let wrapping_key = provider::derive_wrapping_key(password, &salt, WRAP_ITERATIONS);
    let wrapped = provider::aead_seal(&wrapping_key, &iv, &key_bytes)?;

    let mut combined = Vec::with_capacity(1 + SALT_LENGTH + IV_LENGTH + wrapped.len());
    combined.push(u8::from(purpose));
    combined.extend_from_slice(&salt);
    combined.extend_from_slice(&iv);
    combined.extend_from_slice(&wrapped);

    Some(base64url::encode(combined))
}

/// Unwrap a password protected key envelope.
///
/// The algorithm family to parse the recovered bytes with is selected by the
/// embedded type tag.
pub fn unwrap(envelope: &str, password: &str) -> Option<KeyMaterial> {
    let combined = base64url::decode(envelope).ok()?;
    if combined.len() <= 1 + SALT_LENGTH + IV_LENGTH {
        debug!("key envelope too short to unwrap");
        return None;
    }

    let purpose = KeyPurpose::try_from(combined[0]).ok()?;
    let salt = &combined[1..1 + SALT_LENGTH];
    let iv = &combined[1 + SALT_LENGTH..1 + SALT_LENGTH + IV_LENGTH];
    let wrapped = &combined[1 + SALT_LENGTH + IV_LENGTH..];

    let wrapping_key = provider::derive_wrapping_key(password, salt, WRAP_ITERATIONS);
    let key_bytes = provider::aead_open(&wrapping_key, iv, wrapped)?;

    private_key_from_bytes(purpose, &key_bytes)
}

/// Export a public (or symmetric) key as a tagged JWK envelope. No
/// encryption is applied. `None` for private key handles.
pub fn export(key: &KeyMaterial, purpose: KeyPurpose) -> Option<String> {
    let jwk = match key {
        KeyMaterial::EcdsaVerifying(k) => ec_public_jwk(k)?,
        KeyMaterial::RsaPublic(k) => rsa_public_jwk(k),
        KeyMaterial::Symmetric(k) => oct_jwk(k),
        _ => return None,
    };
    let jwk_bytes = serde_json::to_vec(&jwk).ok()?;

    let mut combined = Vec::with_capacity(1 + jwk_bytes.len());
    combined.push(u8::from(purpose));
    combined.extend_from_slice(&jwk_bytes);

    Some(base64url::encode(combined))
}

/// Import a key from a tagged JWK envelope.
pub fn import(envelope: &str) -> Option<KeyMaterial> {
    let combined = base64url::decode(envelope).ok()?;
    let (tag, jwk_bytes) = combined.split_first()?;
    let purpose = KeyPurpose::try_from(*tag).ok()?;
    let jwk: Jwk = serde_json::from_slice(jwk_bytes).ok()?;

    match purpose {
        KeyPurpose::AsymEncrypter => {
            let n = BigUint::from_bytes_be(&base64url::decode(jwk.n.as_deref()?).ok()?);
            let e = BigUint::from_bytes_be(&base64url::decode(jwk.e.as_deref()?).ok()?);
            RsaPublicKey::new(n, e).ok().map(KeyMaterial::RsaPublic)
        }
        KeyPurpose::AsymSigner => {
            let x: [u8; 32] = base64url::decode(jwk.x.as_deref()?).ok()?.try_into().ok()?;
            let y: [u8; 32] = base64url::decode(jwk.y.as_deref()?).ok()?.try_into().ok()?;
            let point = p256::EncodedPoint::from_affine_coordinates(&x.into(), &y.into(), false);
            VerifyingKey::from_encoded_point(&point)
                .ok()
                .map(KeyMaterial::EcdsaVerifying)
        }
        KeyPurpose::SymEncryptor => {
            let k = base64url::decode(jwk.k.as_deref()?).ok()?;
            let bytes: [u8; SYMMETRIC_KEY_LENGTH] = k.try_into().ok()?;
            Some(KeyMaterial::Symmetric(SymmetricKey(bytes)))
        }
    }
}

/// Serialize a private key handle to the bytes that go inside a wrap
/// envelope. PKCS#8 DER for the asymmetric families, raw bytes for AES.
fn private_key_to_bytes(key: &KeyMaterial) -> Option<Vec<u8>> {
    match key {
        KeyMaterial::EcdsaSigning(k) => k.to_pkcs8_der().ok().map(|d| d.as_bytes().to_vec()),
        KeyMaterial::RsaPrivate(k) => k.to_pkcs8_der().ok().map(|d| d.as_bytes().to_vec()),
        KeyMaterial::Symmetric(k) => Some(k.0.to_vec()),
        _ => None,
    }
}

fn private_key_from_bytes(purpose: KeyPurpose, bytes: &[u8]) -> Option<KeyMaterial> {
    match purpose {
        KeyPurpose::AsymEncrypter => RsaPrivateKey::from_pkcs8_der(bytes)
            .ok()
            .map(KeyMaterial::RsaPrivate),
        KeyPurpose::AsymSigner => SigningKey::from_pkcs8_der(bytes)
            .ok()
            .map(KeyMaterial::EcdsaSigning),
        KeyPurpose::SymEncryptor => {
            let key: [u8; SYMMETRIC_KEY_LENGTH] = bytes.try_into().ok()?;
            Some(KeyMaterial::Symmetric(SymmetricKey(key)))
        }
    }
}

/// The subset of the JSON Web Key fields the envelope formats use.
#[derive(Serialize, Deserialize)]
struct Jwk {
    kty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    crv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    e: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    k: Option<String>,
}

impl Jwk {
    fn new(kty: &str) -> Self {
        Jwk {
            kty: kty.to_string(),
            crv: None,
            x: None,
            y: None,
            n: None,
            e: None,
            k: None,
        }
    }
}

fn ec_public_jwk(key: &VerifyingKey) -> Option<Jwk> {
    let point = key.to_encoded_point(false);
    let mut jwk = Jwk::new("EC");
    jwk.crv = Some("P-256".to_string());
    jwk.x = Some(base64url::encode(point.x()?));
    jwk.y = Some(base64url::encode(point.y()?));
    Some(jwk)
}

fn rsa_public_jwk(key: &RsaPublicKey) -> Jwk {
    let mut jwk = Jwk::new("RSA");
    jwk.n = Some(base64url::encode(key.n().to_bytes_be()));
    jwk.e = Some(base64url::encode(key.e().to_bytes_be()));
    jwk
}

fn oct_jwk(key: &SymmetricKey) -> Jwk {
    let mut jwk = Jwk::new("oct");
    jwk.k = Some(base64url::encode(key.0));
    jwk
}

// Key handles serialize through the export envelope, so a decoded credential
// carrying one still round-trips over JSON. Private key material refuses to
// serialize.
impl Serialize for KeyMaterial {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let purpose = match self {
            KeyMaterial::EcdsaVerifying(_) => KeyPurpose::AsymSigner,
            KeyMaterial::RsaPublic(_) => KeyPurpose::AsymEncrypter,
            KeyMaterial::Symmetric(_) => KeyPurpose::SymEncryptor,
            KeyMaterial::EcdsaSigning(_) | KeyMaterial::RsaPrivate(_) => {
                return Err(serde::ser::Error::custom(
                    "private key material does not serialize",
                ))
            }
        };
        let envelope = export(self, purpose)
            .ok_or_else(|| serde::ser::Error::custom("key material could not be exported"))?;
        serializer.serialize_str(&envelope)
    }
}

impl<'de> Deserialize<'de> for KeyMaterial {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let envelope = String::deserialize(deserializer)?;
        import(&envelope)
            .ok_or_else(|| serde::de::Error::custom("string is not a key envelope"))
    }
}
