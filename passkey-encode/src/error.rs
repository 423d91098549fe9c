use thiserror::Error;

/// Failure to decode a byte/string envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input was not valid base64 in any accepted alphabet.
    #[error("input is not valid base64")]
    InvalidBase64,

    /// The input was not a valid hex string.
    #[error("input is not valid hex")]
    InvalidHex,

    /// The decoded bytes were not valid utf-8.
    #[error("decoded bytes are not valid utf-8")]
    InvalidUtf8,

    /// The decoded bytes were not the expected JSON document.
    #[error("decoded bytes are not the expected json")]
    InvalidJson(#[from] serde_json::Error),
}
