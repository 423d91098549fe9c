use thiserror::Error;

pub use passkey_encode::DecodeError;

/// Why a challenge failed to validate. The variants discriminate for audit
/// logging; callers facing an external client should collapse them into one
/// generic rejection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChallengeError {
    /// No live challenge with that id. Covers never-issued, already
    /// consumed, and swept-after-expiry ids alike.
    #[error("no live challenge with that id")]
    NotFound,

    /// The challenge exists but was issued for a different operation.
    #[error("challenge was issued for a different purpose")]
    WrongPurpose,

    /// The challenge is past its expiry.
    #[error("challenge has expired")]
    Expired,
}

/// Malformed binary authenticator data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The blob is shorter than the fields it claims to carry.
    #[error("authenticator data is truncated at {0} bytes")]
    TruncatedData(usize),
}

/// Why a wire encoded registration was rejected.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A field of the record was not valid base64url JSON.
    #[error("registration record could not be decoded: {0}")]
    Decode(#[from] DecodeError),

    /// The echoed challenge did not validate.
    #[error("registration challenge was rejected: {0}")]
    Challenge(#[from] ChallengeError),
}

/// A passkey storage backend failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `name` is a unique secondary key; another passkey already holds it.
    #[error("a passkey named {0:?} already exists")]
    DuplicateName(String),

    /// The backing file could not be read or written.
    #[error("keychain io failure: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file held something other than a passkey list.
    #[error("keychain contents could not be (de)serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}
