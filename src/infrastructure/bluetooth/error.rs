//! Error types for the device interaction protocol

use thiserror::Error;

/// Payload decoding and command script parsing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("invalid hex token {token:?} at position {index}")]
    InvalidHexToken { index: usize, token: String },

    #[error("command script is empty")]
    EmptyScript,
}

/// Errors observed while talking to a peripheral
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BleError {
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("communication error: {0}")]
    CommunicationError(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, BleError>;
