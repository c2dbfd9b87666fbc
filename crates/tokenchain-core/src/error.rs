//! Error types for the token chain core.

use thiserror::Error;

/// Errors that can occur while building, encoding, decoding or signing
/// token chain blocks, contract blocks and RAC units.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Neither (or both) of raw bytes and a record were supplied, or the
    /// supplied input is empty.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid block, missing block content")]
    MissingContent,

    #[error("invalid block, missing {0}")]
    MissingSignature(&'static str),

    #[error("invalid block, missing field: {0}")]
    MissingField(String),

    #[error("invalid type for {field}: expected {expected}")]
    InvalidType {
        field: String,
        expected: &'static str,
    },

    #[error("unsupported type code: {0}")]
    UnsupportedType(i64),

    #[error("signature verification failed for {0}")]
    SignatureInvalid(String),

    #[error("failed to read chain head for token {token}: {reason}")]
    ChainReadError { token: String, reason: String },

    #[error("block hash is not available")]
    HashUnavailable,

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("crypto error: {0}")]
    Crypto(String),
}

impl CoreError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        CoreError::MissingField(field.into())
    }

    pub(crate) fn invalid_type(field: impl Into<String>, expected: &'static str) -> Self {
        CoreError::InvalidType {
            field: field.into(),
            expected,
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
