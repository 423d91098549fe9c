//! Conversion between wire encoded and structured registration records, and
//! the server side acceptance step that consumes the echoed challenge.

use tracing::debug;

use passkey_encode::{base64url, DecodeError};

use crate::challenge::ChallengeRegistry;
use crate::error::RegistrationError;
use crate::proto::{ChallengePurpose, Registration};

impl Registration {
    /// The wire form of this record. Each structured field is base64url
    /// JSON encoded independently. Already encoded records pass through.
    pub fn encode(&self) -> Result<Registration, DecodeError> {
        match self {
            Registration::Encoded { .. } => Ok(self.clone()),
            Registration::Decoded {
                username,
                credential,
                client_data,
                authenticator,
                signature,
            } => Ok(Registration::Encoded {
                username: username.clone(),
                credential: base64url::encode_json(credential)?,
                client_data: base64url::encode_json(client_data)?,
                authenticator: base64url::encode_json(authenticator)?,
                signature: signature.clone(),
            }),
        }
    }

    /// The structured form of this record. Already decoded records pass
    /// through.
    pub fn decode(&self) -> Result<Registration, DecodeError> {
        match self {
            Registration::Decoded { .. } => Ok(self.clone()),
            Registration::Encoded {
                username,
                credential,
                client_data,
                authenticator,
                signature,
            } => Ok(Registration::Decoded {
                username: username.clone(),
                credential: base64url::decode_json(credential)?,
                client_data: base64url::decode_json(client_data)?,
                authenticator: base64url::decode_json(authenticator)?,
                signature: signature.clone(),
            }),
        }
    }
}

/// Accept a submitted registration record.
///
/// Decodes the record, then validates and consumes the challenge its client
/// data echoes, against the register purpose. This is the only place the
/// challenge registry and registration data meet.
pub fn process_registration(
    registration: &Registration,
    registry: &ChallengeRegistry,
) -> Result<Registration, RegistrationError> {
    let decoded = registration.decode()?;

    let Registration::Decoded { client_data, username, .. } = &decoded else {
        // decode() only ever returns the decoded variant.
        return Err(RegistrationError::Challenge(
            crate::error::ChallengeError::NotFound,
        ));
    };

    registry.validate(&client_data.challenge, ChallengePurpose::Register)?;
    debug!(username = %username, "registration accepted");

    Ok(decoded)
}
