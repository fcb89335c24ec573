//! Error types for document store access.
//!
//! [`StoreError`] is what a [`crate::DocumentStore`] raises; it reaches
//! callers unchanged inside [`DbError::Store`].

use thiserror::Error;

/// Errors raised by a document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Handshake with the server failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Operation issued without a live connection
    #[error("Not connected")]
    NotConnected,

    /// Collection already exists
    #[error("Namespace already exists: {0}")]
    NamespaceExists(String),

    /// Document violates a unique key
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Update document is not supported
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    /// Document or filter cannot be represented for the server
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Any other error reported by the driver
    #[error("Driver error: {0}")]
    Driver(String),
}

/// Result type for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Create a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an invalid update error.
    #[must_use]
    pub fn invalid_update(msg: impl Into<String>) -> Self {
        Self::InvalidUpdate(msg.into())
    }
}

/// Errors raised by the connection manager and accessors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Required connection settings are missing
    #[error("Could not load driver configuration: {0}")]
    Configuration(String),

    /// Error raised by the document store
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The client was disconnected
    #[error("Client has been disconnected")]
    ClientClosed,

    /// Database or collection name is not usable
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Credential hash could not be verified
    #[error(transparent)]
    Crypto(#[from] sdk_crypto::CryptoError),
}

/// Result type for connection manager and accessor operations.
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid name error.
    #[must_use]
    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self::InvalidName(msg.into())
    }

    /// The store error, if this error came from the store.
    #[must_use]
    pub const fn as_store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::configuration("missing DB_USERNAME");
        assert_eq!(
            err.to_string(),
            "Could not load driver configuration: missing DB_USERNAME"
        );
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: DbError = StoreError::connection("refused").into();
        assert_eq!(err.to_string(), "Connection failed: refused");
        assert_eq!(
            err.as_store_error(),
            Some(&StoreError::Connection("refused".to_string()))
        );
    }

    #[test]
    fn test_non_store_error() {
        assert!(DbError::ClientClosed.as_store_error().is_none());
    }
}
