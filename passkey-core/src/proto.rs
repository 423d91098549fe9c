//! Wire types for the registration protocol.
//!
//! JSON field names are camelCase on the wire. The dual state records
//! ([`Credential`], [`Registration`]) are sum types tagged by `state`, so a
//! consumer always knows which form it holds and matching stays exhaustive.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;
use uuid::Uuid;

use passkey_crypto::{key, KeyMaterial};
use passkey_encode::Base64UrlData;

/// The operation a challenge or client data record was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengePurpose {
    /// Registering a new credential.
    #[serde(rename = "webauthn.register")]
    Register,
    /// Asserting an existing credential.
    #[serde(rename = "webauthn.login")]
    Login,
}

/// A one time anti-replay challenge. `expires` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub purpose: ChallengePurpose,
    pub expires: u64,
}

/// The credential manager family that produced a client data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthenticatorKind {
    #[serde(rename = "webauthn")]
    Webauthn,
}

/// The client's echo of a challenge, bound to an origin and operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientData {
    pub authenticator: AuthenticatorKind,
    pub challenge: String,
    pub origin: String,
    #[serde(rename = "type")]
    pub type_: ChallengePurpose,
}

/// The authenticator data flags byte.
///
/// Bit layout per the WebAuthn authenticator data format: 0 user present,
/// 2 user verified, 3 backup eligible, 4 backup state, 6 attested
/// credential data included, 7 extension data included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthenticatorFlags(pub u8);

impl AuthenticatorFlags {
    pub fn user_present(&self) -> bool {
        self.0 & (1 << 0) != 0
    }

    pub fn user_verified(&self) -> bool {
        self.0 & (1 << 2) != 0
    }

    pub fn backup_eligible(&self) -> bool {
        self.0 & (1 << 3) != 0
    }

    pub fn backup_state(&self) -> bool {
        self.0 & (1 << 4) != 0
    }

    pub fn attested_credential_data(&self) -> bool {
        self.0 & (1 << 6) != 0
    }

    pub fn extension_data(&self) -> bool {
        self.0 & (1 << 7) != 0
    }
}

/// The structured form of a binary authenticator data blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authenticator {
    /// SHA-256 of the relying party id, kept opaque.
    pub rp_id_hash: Base64UrlData,
    pub flags: AuthenticatorFlags,
    /// Signature counter, big-endian on the wire.
    pub counter: u32,
    /// Identifies the authenticator model. All zero when not attested.
    pub aaguid: Uuid,
    /// Human readable model name resolved from the AAGUID.
    pub name: String,
}

/// COSE signature algorithm identifiers, serialized as their registry
/// numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoseAlgorithm {
    /// ECDSA P-256 with SHA-256.
    ES256,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    RS256,
}

impl From<CoseAlgorithm> for i64 {
    fn from(alg: CoseAlgorithm) -> i64 {
        match alg {
            CoseAlgorithm::ES256 => -7,
            CoseAlgorithm::RS256 => -257,
        }
    }
}

impl TryFrom<i64> for CoseAlgorithm {
    type Error = ();

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -7 => Ok(CoseAlgorithm::ES256),
            -257 => Ok(CoseAlgorithm::RS256),
            _ => Err(()),
        }
    }
}

impl Serialize for CoseAlgorithm {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(i64::from(*self))
    }
}

impl<'de> Deserialize<'de> for CoseAlgorithm {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        CoseAlgorithm::try_from(value)
            .map_err(|_| DeError::custom(format!("{value} is not a supported cose algorithm")))
    }
}

/// A public key credential, either as it travels (public key still a base64
/// envelope) or as it is used (public key imported into a handle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Credential {
    #[serde(rename_all = "camelCase")]
    Encoded {
        id: String,
        #[serde(rename = "type")]
        type_: String,
        public_key: String,
        algorithm: CoseAlgorithm,
    },
    #[serde(rename_all = "camelCase")]
    Decoded {
        id: String,
        #[serde(rename = "type")]
        type_: String,
        public_key: KeyMaterial,
        algorithm: CoseAlgorithm,
    },
}

/// A registration record.
///
/// The encoded form carries `credential`, `clientData` and `authenticator`
/// as three independently base64url-JSON-encoded strings, ready for
/// transport. The decoded form carries the structured objects. Conversion
/// between the two lives in [`crate::registration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Registration {
    #[serde(rename_all = "camelCase")]
    Encoded {
        username: String,
        credential: String,
        client_data: String,
        authenticator: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Decoded {
        username: String,
        credential: Credential,
        client_data: ClientData,
        authenticator: Authenticator,
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
}

impl Registration {
    /// The username the record was submitted for, in either state.
    pub fn username(&self) -> &str {
        match self {
            Registration::Encoded { username, .. } | Registration::Decoded { username, .. } => {
                username
            }
        }
    }
}

/// A stored passkey.
///
/// `wrapped = true` means `private_key` is a password-protected key envelope
/// and [`Passkey::unwrap_private_key`] applies. `wrapped = false` means the
/// private key never left the platform authenticator and the field is an
/// opaque reference this crate cannot open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passkey {
    pub id: Uuid,
    /// Unique display name, the secondary lookup key in storage.
    pub name: String,
    /// Public key export envelope.
    pub public_key: String,
    pub private_key: String,
    pub wrapped: bool,
    pub algorithm: CoseAlgorithm,
}

impl Passkey {
    /// Recover the private key handle from a wrapped passkey. `None` for a
    /// wrong password, a damaged envelope, or a platform-held key.
    pub fn unwrap_private_key(&self, password: &str) -> Option<KeyMaterial> {
        if !self.wrapped {
            debug!(id = %self.id, "passkey private key is platform-held, cannot unwrap");
            return None;
        }
        key::unwrap(&self.private_key, password)
    }

    /// Import the public key handle.
    pub fn public_key(&self) -> Option<KeyMaterial> {
        key::import(&self.public_key)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn challenge_purpose_wire_names() {
        assert_eq!(
            serde_json::to_value(ChallengePurpose::Register).unwrap(),
            json!("webauthn.register")
        );
        assert_eq!(
            serde_json::from_value::<ChallengePurpose>(json!("webauthn.login")).unwrap(),
            ChallengePurpose::Login
        );
    }

    #[test]
    fn cose_algorithm_is_numeric_on_the_wire() {
        assert_eq!(serde_json::to_value(CoseAlgorithm::ES256).unwrap(), json!(-7));
        assert_eq!(
            serde_json::from_value::<CoseAlgorithm>(json!(-257)).unwrap(),
            CoseAlgorithm::RS256
        );
        assert!(serde_json::from_value::<CoseAlgorithm>(json!(-8)).is_err());
    }

    #[test]
    fn flags_bit_accessors() {
        let flags = AuthenticatorFlags(0b0100_0101);
        assert!(flags.user_present());
        assert!(flags.user_verified());
        assert!(flags.attested_credential_data());
        assert!(!flags.backup_eligible());
        assert!(!flags.backup_state());
        assert!(!flags.extension_data());
        assert_eq!(serde_json::to_value(flags).unwrap(), json!(69));
    }

    #[test]
    fn registration_state_tag() {
        let record = Registration::Encoded {
            username: "ada".to_string(),
            credential: "Y3JlZA".to_string(),
            client_data: "Y2xpZW50".to_string(),
            authenticator: "YXV0aA".to_string(),
            signature: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value.get("state"), Some(&json!("encoded")));
        assert_eq!(value.get("clientData"), Some(&json!("Y2xpZW50")));
        assert!(value.get("signature").is_none());

        let back: Registration = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.username(), "ada");
    }

    #[test]
    fn client_data_wire_shape() {
        let client_data = ClientData {
            authenticator: AuthenticatorKind::Webauthn,
            challenge: "abc".to_string(),
            origin: "localhost".to_string(),
            type_: ChallengePurpose::Register,
        };
        let value = serde_json::to_value(&client_data).unwrap();
        assert_eq!(value.get("authenticator"), Some(&json!("webauthn")));
        assert_eq!(value.get("type"), Some(&json!("webauthn.register")));
    }
}
