//! The three part signed bearer token: `header.payload.signature`.
//!
//! Header and payload are base64url encoded JSON objects, the signature is
//! the raw 64 byte `r || s` ECDSA P-256 signature over the literal
//! `header.payload` text. Timestamps (`iat`, `exp`) are fractional unix
//! seconds.

use p256::ecdsa::{SigningKey, VerifyingKey};
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::debug;

use passkey_encode::base64url;

use crate::provider;

/// Why a token failed verification or inspection. The variants are ordered
/// by the checks that produce them, so a caller can distinguish a malformed
/// token from a forged or stale one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The token is not three non-empty dot separated parts.
    #[error("token is not three non-empty parts")]
    InvalidFormat,

    /// The header decoded, but is not an ES256 JWT header.
    #[error("token header is not a jwt header")]
    InvalidHeader,

    /// The payload decoded, but carries no usable expiry claim.
    #[error("token payload has no numeric exp claim")]
    InvalidPayload,

    /// The signature does not verify under the supplied key.
    #[error("token signature does not verify")]
    InvalidSignature,

    /// The `exp` claim is in the past.
    #[error("token has expired")]
    Expired,

    /// A part was not decodable base64/JSON at all.
    #[error("token part could not be parsed")]
    CantParse,
}

/// The result of inspecting a token without verifying it. Any part that
/// fails to decode is simply absent, with the failure noted in `error`.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInspection {
    /// The decoded header object, if the header part parsed.
    pub header: Option<Map<String, Value>>,
    /// The decoded payload object, if the payload part parsed.
    pub payload: Option<Map<String, Value>>,
    /// The raw signature bytes, if the signature part decoded.
    pub signature: Option<Vec<u8>>,
    /// The token text as supplied.
    pub raw: String,
    /// The first decoding failure encountered, if any.
    pub error: Option<TokenError>,
}

/// Sign a claims object into a token.
///
/// `iat` is always stamped with the current time. `exp` defaults to the
/// current time as well, so a caller that wants a token valid for any length
/// of time must supply its own `exp` claim.
pub fn sign(claims: &Map<String, Value>, key: &SigningKey) -> Result<String, TokenError> {
    let mut header = Map::new();
    header.insert("alg".to_string(), Value::String("ES256".to_string()));
    header.insert("typ".to_string(), Value::String("JWT".to_string()));

    let now = provider::now_secs();
    let mut payload = Map::new();
    payload.insert("iat".to_string(), float_claim(now));
    payload.insert("exp".to_string(), float_claim(now));
    for (claim, value) in claims {
        payload.insert(claim.clone(), value.clone());
    }

    let header_b64 = base64url::encode_json(&header).map_err(|_| TokenError::CantParse)?;
    let payload_b64 = base64url::encode_json(&payload).map_err(|_| TokenError::CantParse)?;

    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = provider::ecdsa_sign(key, signing_input.as_bytes());

    Ok(format!("{signing_input}.{}", base64url::encode(signature)))
}

/// Verify a token and return its payload.
///
/// Checks run in a fixed order: shape, decodability, header type, signature,
/// then expiry, and the first failure wins.
pub fn verify(token: &str, key: &VerifyingKey) -> Result<Map<String, Value>, TokenError> {
    let (header_b64, payload_b64, signature_b64) = split(token)?;

    let header: Map<String, Value> =
        base64url::decode_json(header_b64).map_err(|_| TokenError::CantParse)?;
    let payload: Map<String, Value> =
        base64url::decode_json(payload_b64).map_err(|_| TokenError::CantParse)?;
    let signature = base64url::decode(signature_b64).map_err(|_| TokenError::CantParse)?;

    if header.get("typ").and_then(Value::as_str) != Some("JWT") {
        return Err(TokenError::InvalidHeader);
    }

    // Some encoders emit fewer than 64 raw r || s bytes; the tail is zero
    // filled.
    if signature.len() > 64 {
        return Err(TokenError::InvalidSignature);
    }
    let mut padded = [0u8; 64];
    padded[..signature.len()].copy_from_slice(&signature);

    let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
    if !provider::ecdsa_verify(key, signing_input.as_bytes(), &padded) {
        debug!("token signature failed verification");
        return Err(TokenError::InvalidSignature);
    }

    let exp = payload
        .get("exp")
        .and_then(Value::as_f64)
        .ok_or(TokenError::InvalidPayload)?;
    if exp <= provider::now_secs() {
        return Err(TokenError::Expired);
    }

    Ok(payload)
}

/// Decode a token for inspection, without verifying the signature.
pub fn decode(token: &str) -> TokenInspection {
    let mut inspection = TokenInspection {
        header: None,
        payload: None,
        signature: None,
        raw: token.to_string(),
        error: None,
    };

    let (header_b64, payload_b64, signature_b64) = match split(token) {
        Ok(parts) => parts,
        Err(e) => {
            inspection.error = Some(e);
            return inspection;
        }
    };

    let note = |e: TokenError, error: &mut Option<TokenError>| {
        if error.is_none() {
            *error = Some(e);
        }
    };

    match base64url::decode_json(header_b64) {
        Ok(header) => inspection.header = Some(header),
        Err(_) => note(TokenError::CantParse, &mut inspection.error),
    }
    match base64url::decode_json(payload_b64) {
        Ok(payload) => inspection.payload = Some(payload),
        Err(_) => note(TokenError::CantParse, &mut inspection.error),
    }
    match base64url::decode(signature_b64) {
        Ok(signature) => inspection.signature = Some(signature),
        Err(_) => note(TokenError::CantParse, &mut inspection.error),
    }

    inspection
}

fn split(token: &str) -> Result<(&str, &str, &str), TokenError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() && !s.is_empty() => {
            Ok((h, p, s))
        }
        _ => Err(TokenError::InvalidFormat),
    }
}

fn float_claim(secs: f64) -> Value {
    Number::from_f64(secs).map(Value::Number).unwrap_or(
        // NaN/infinite timestamps cannot occur from the system clock.
        Value::Number(Number::from(0)),
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::provider::generate_signing_keypair;
    use serde_json::json;

    fn claims(exp: f64) -> Map<String, Value> {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("user-1"));
        claims.insert("exp".to_string(), json!(exp));
        claims
    }

    #[test]
    fn sign_verify_roundtrip() {
        let (signing, verifying) = generate_signing_keypair();
        let token = sign(&claims(provider::now_secs() + 60.0), &signing).unwrap();

        let payload = verify(&token, &verifying).unwrap();
        assert_eq!(payload.get("sub"), Some(&json!("user-1")));
        assert!(payload.get("iat").and_then(Value::as_f64).is_some());
    }

    #[test]
    fn verify_rejects_other_key() {
        let (signing, _) = generate_signing_keypair();
        let (_, other_verifying) = generate_signing_keypair();
        let token = sign(&claims(provider::now_secs() + 60.0), &signing).unwrap();
        assert_eq!(
            verify(&token, &other_verifying),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let (signing, verifying) = generate_signing_keypair();
        let token = sign(&claims(provider::now_secs() + 60.0), &signing).unwrap();

        let (header, _, signature) = split(&token).unwrap();
        let mut forged = claims(provider::now_secs() + 60.0);
        forged.insert("sub".to_string(), json!("user-2"));
        let forged = format!(
            "{header}.{}.{signature}",
            base64url::encode_json(&forged).unwrap()
        );
        assert_eq!(verify(&forged, &verifying), Err(TokenError::InvalidSignature));

        // A signature longer than the raw r || s form never verifies.
        let (header, payload, _) = split(&token).unwrap();
        let oversized = format!("{header}.{payload}.{}", base64url::encode([0u8; 65]));
        assert_eq!(
            verify(&oversized, &verifying),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn verify_rejects_expired() {
        let (signing, verifying) = generate_signing_keypair();
        let token = sign(&claims(provider::now_secs() - 1.0), &signing).unwrap();
        assert_eq!(verify(&token, &verifying), Err(TokenError::Expired));

        // The default exp is "now", which has already passed by verify time.
        let token = sign(&Map::new(), &signing).unwrap();
        assert_eq!(verify(&token, &verifying), Err(TokenError::Expired));
    }

    #[test]
    fn verify_rejects_bad_shapes() {
        let (_, verifying) = generate_signing_keypair();
        for token in ["", "a.b", "a.b.c.d", "..", "a..c"] {
            assert_eq!(verify(token, &verifying), Err(TokenError::InvalidFormat));
        }
        assert_eq!(
            verify("!!!.!!!.!!!", &verifying),
            Err(TokenError::CantParse)
        );
    }

    #[test]
    fn verify_rejects_wrong_header_type() {
        let (signing, verifying) = generate_signing_keypair();
        let token = sign(&claims(provider::now_secs() + 60.0), &signing).unwrap();
        let (_, payload, signature) = split(&token).unwrap();

        let header = base64url::encode_json(&json!({ "alg": "ES256", "typ": "JXT" })).unwrap();
        let forged = format!("{header}.{payload}.{signature}");
        assert_eq!(verify(&forged, &verifying), Err(TokenError::InvalidHeader));

        // With both a bad header and an oversized signature, the header
        // check wins.
        let oversized = base64url::encode([0u8; 65]);
        let forged = format!("{header}.{payload}.{oversized}");
        assert_eq!(verify(&forged, &verifying), Err(TokenError::InvalidHeader));
    }

    #[test]
    fn verify_rejects_missing_exp() {
        let (signing, verifying) = generate_signing_keypair();
        let token = sign(&claims(provider::now_secs() + 60.0), &signing).unwrap();
        let (header, _, _) = split(&token).unwrap();

        // Re-sign a payload whose exp claim is not numeric.
        let payload = base64url::encode_json(&json!({ "exp": "tomorrow" })).unwrap();
        let signing_input = format!("{header}.{payload}");
        let signature = provider::ecdsa_sign(&signing, signing_input.as_bytes());
        let forged = format!("{signing_input}.{}", base64url::encode(signature));
        assert_eq!(verify(&forged, &verifying), Err(TokenError::InvalidPayload));
    }

    #[test]
    fn decode_inspects_without_verifying() {
        let (signing, _) = generate_signing_keypair();
        let token = sign(&claims(provider::now_secs() + 60.0), &signing).unwrap();

        let inspection = decode(&token);
        assert!(inspection.error.is_none());
        assert_eq!(
            inspection.header.unwrap().get("alg"),
            Some(&json!("ES256"))
        );
        assert_eq!(
            inspection.payload.unwrap().get("sub"),
            Some(&json!("user-1"))
        );
        assert_eq!(inspection.signature.unwrap().len(), 64);
        assert_eq!(inspection.raw, token);
    }

    #[test]
    fn decode_notes_failures() {
        let inspection = decode("one.two");
        assert_eq!(inspection.error, Some(TokenError::InvalidFormat));
        assert!(inspection.header.is_none());
        // A failed inspection still copies whole, error included.
        assert_eq!(inspection.clone(), inspection);

        let (signing, _) = generate_signing_keypair();
        let token = sign(&claims(provider::now_secs() + 60.0), &signing).unwrap();
        let (_, payload, signature) = split(&token).unwrap();
        let inspection = decode(&format!("!!!.{payload}.{signature}"));
        assert_eq!(inspection.error, Some(TokenError::CantParse));
        assert!(inspection.header.is_none());
        assert!(inspection.payload.is_some());
        assert!(inspection.signature.is_some());
    }
}
