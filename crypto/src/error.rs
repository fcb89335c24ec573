//! Crypto error types.

use thiserror::Error;

/// Errors raised by hashing helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Stored hash is not in `salt:key` form
    #[error("Malformed hash: {0}")]
    MalformedHash(String),

    /// Input could not be decoded with the requested encoding
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Key material was rejected by the primitive
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Key derivation parameters are out of range
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

impl CryptoError {
    /// Create a malformed hash error.
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedHash(msg.into())
    }

    /// Create a decoding error.
    #[must_use]
    pub fn decoding(msg: impl Into<String>) -> Self {
        Self::Decoding(msg.into())
    }
}
