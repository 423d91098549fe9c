//! Lossless byte/string conversions used by every passkey-rs wire format.
//!
//! Everything here encodes to unpadded url-safe base64, but decoding is
//! forgiving and will accept padded input and the standard alphabet as well,
//! to account for the many base64 dialects produced by clients and libraries.

#![deny(warnings)]
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::engine::GeneralPurpose;
use base64::Engine;
use serde::de::{Error as DeError, SeqAccess, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

mod error;

pub use error::DecodeError;

/// The base64 engines we are willing to decode from, in the order they are
/// attempted.
static ALLOWED_DECODING_ENGINES: &[GeneralPurpose] =
    &[URL_SAFE_NO_PAD, URL_SAFE, STANDARD, STANDARD_NO_PAD];

/// Url-safe base64 string conversions.
pub mod base64url {
    use super::*;

    /// Encode bytes to an unpadded url-safe base64 string.
    pub fn encode(data: impl AsRef<[u8]>) -> String {
        URL_SAFE_NO_PAD.encode(data)
    }

    /// Decode a base64 string, forgiving the alphabet and padding used.
    pub fn decode(data: &str) -> Result<Vec<u8>, DecodeError> {
        for engine in ALLOWED_DECODING_ENGINES {
            if let Ok(bytes) = engine.decode(data) {
                return Ok(bytes);
            }
        }
        Err(DecodeError::InvalidBase64)
    }

    /// Serialize a value to JSON and encode it as unpadded url-safe base64.
    pub fn encode_json<T: Serialize>(value: &T) -> Result<String, DecodeError> {
        let json = serde_json::to_vec(value)?;
        Ok(encode(json))
    }

    /// Decode a base64 string and deserialize the contained JSON document.
    pub fn decode_json<T: serde::de::DeserializeOwned>(data: &str) -> Result<T, DecodeError> {
        let bytes = decode(data)?;
        let value = serde_json::from_slice(&bytes)?;
        Ok(value)
    }
}

/// Lower-case hex string conversions.
pub mod hexstr {
    use super::DecodeError;

    /// Encode bytes as a lower-case hex string.
    pub fn encode(data: impl AsRef<[u8]>) -> String {
        hex::encode(data)
    }

    /// Decode a hex string to bytes.
    pub fn decode(data: &str) -> Result<Vec<u8>, DecodeError> {
        hex::decode(data).map_err(|_| DecodeError::InvalidHex)
    }
}

/// Utf-8 string conversions.
pub mod utf8 {
    use super::DecodeError;

    /// Decode bytes as a utf-8 string.
    pub fn decode(data: Vec<u8>) -> Result<String, DecodeError> {
        String::from_utf8(data).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Deserialize a JSON document from raw utf-8 bytes.
    pub fn decode_json<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T, DecodeError> {
        let value = serde_json::from_slice(data)?;
        Ok(value)
    }
}

/// A container for binary that serializes to an unpadded url-safe base64
/// string. Deserialization accepts the other common base64 alphabets, or a
/// plain byte sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Base64UrlData(pub Vec<u8>);

impl fmt::Display for Base64UrlData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", base64url::encode(&self.0))
    }
}

impl From<Vec<u8>> for Base64UrlData {
    fn from(v: Vec<u8>) -> Base64UrlData {
        Base64UrlData(v)
    }
}

impl From<&[u8]> for Base64UrlData {
    fn from(v: &[u8]) -> Base64UrlData {
        Base64UrlData(v.to_vec())
    }
}

impl From<Base64UrlData> for Vec<u8> {
    fn from(v: Base64UrlData) -> Vec<u8> {
        v.0
    }
}

impl AsRef<[u8]> for Base64UrlData {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&str> for Base64UrlData {
    type Error = DecodeError;

    fn try_from(v: &str) -> Result<Self, Self::Error> {
        base64url::decode(v).map(Base64UrlData)
    }
}

struct Base64UrlDataVisitor;

impl<'de> Visitor<'de> for Base64UrlDataVisitor {
    type Value = Base64UrlData;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a base64 url encoded string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: DeError,
    {
        base64url::decode(v)
            .map(Base64UrlData)
            .map_err(|_| DeError::invalid_value(Unexpected::Str(v), &self))
    }

    fn visit_seq<A>(self, mut v: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut data = match v.size_hint() {
            Some(sz) => Vec::with_capacity(sz),
            None => Vec::new(),
        };

        while let Some(i) = v.next_element()? {
            data.push(i)
        }
        Ok(Base64UrlData(data))
    }
}

impl<'de> Deserialize<'de> for Base64UrlData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(Base64UrlDataVisitor)
    }
}

impl Serialize for Base64UrlData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&base64url::encode(&self.0))
    }
}
