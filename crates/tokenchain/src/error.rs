//! Error types for the ledger.

use thiserror::Error;
use tokenchain_core::CoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Block codec, chaining or signature error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// No chain is known for the token.
    #[error("token not found: {0}")]
    TokenNotFound(String),

    /// The block does not extend the current head.
    #[error("block for token {token} does not extend head: expected {expected}, got {got}")]
    NotNextBlock {
        token: String,
        expected: String,
        got: String,
    },

    /// Signing was requested but no signer is configured.
    #[error("no signer configured")]
    NoSigner,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
