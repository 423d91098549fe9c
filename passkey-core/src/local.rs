//! A software registrar for hosts without a platform authenticator.
//!
//! Produces the same wire encoded registration record a platform
//! authenticator would, from a freshly generated P-256 signing pair. The
//! synthetic authenticator reports zeroed flags and counter, the all-zero
//! AAGUID, and a fixed model name.

use tracing::debug;
use uuid::Uuid;

use passkey_crypto::{key, provider, KeyMaterial, KeyPurpose};

use crate::constants::LOCAL_AUTHENTICATOR_NAME;
use crate::proto::{
    Authenticator, AuthenticatorFlags, AuthenticatorKind, ClientData, CoseAlgorithm, Credential,
    Passkey, Registration,
};

/// The product of a local registration: the wire record to submit, plus the
/// key material the caller is responsible for storing.
pub struct LocalRegistration {
    /// The wire encoded registration record.
    pub registration: Registration,
    /// The credential id, also used as the passkey id.
    pub credential_id: Uuid,
    /// Public key export envelope, as embedded in the record.
    pub public_key: String,
    /// The private signing key. Never leaves this process unless wrapped.
    pub private_key: KeyMaterial,
}

impl LocalRegistration {
    /// Wrap the private key under `password` and assemble a storable
    /// passkey named `name`.
    pub fn to_passkey(&self, name: &str, password: &str) -> Option<Passkey> {
        let wrapped = key::wrap(&self.private_key, password, KeyPurpose::AsymSigner)?;
        Some(Passkey {
            id: self.credential_id,
            name: name.to_string(),
            public_key: self.public_key.clone(),
            private_key: wrapped,
            wrapped: true,
            algorithm: CoseAlgorithm::ES256,
        })
    }
}

/// Build a registration record locally for `username`, echoing
/// `challenge_id` bound to `origin`.
///
/// `None` if key generation artifacts could not be serialized; there is no
/// partial success.
pub fn create_registration(
    username: &str,
    challenge_id: &str,
    origin: &str,
) -> Option<LocalRegistration> {
    let credential_id = provider::random_uuid();
    let (signing, verifying) = provider::generate_signing_keypair();
    let public_key = key::export(
        &KeyMaterial::EcdsaVerifying(verifying),
        KeyPurpose::AsymSigner,
    )?;

    let decoded = Registration::Decoded {
        username: username.to_string(),
        credential: Credential::Encoded {
            id: credential_id.to_string(),
            type_: "public-key".to_string(),
            public_key: public_key.clone(),
            algorithm: CoseAlgorithm::ES256,
        },
        client_data: ClientData {
            authenticator: AuthenticatorKind::Webauthn,
            challenge: challenge_id.to_string(),
            origin: origin.to_string(),
            type_: crate::proto::ChallengePurpose::Register,
        },
        authenticator: Authenticator {
            rp_id_hash: provider::sha256(origin.as_bytes()).as_ref().into(),
            flags: AuthenticatorFlags::default(),
            counter: 0,
            aaguid: Uuid::nil(),
            name: LOCAL_AUTHENTICATOR_NAME.to_string(),
        },
        signature: None,
    };

    let registration = decoded.encode().ok()?;
    debug!(username, %credential_id, "local registration created");

    Some(LocalRegistration {
        registration,
        credential_id,
        public_key,
        private_key: KeyMaterial::EcdsaSigning(signing),
    })
}
