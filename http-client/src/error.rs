//! HTTP client error types.
//!
//! Only failures that prevent a response from being received are errors.
//! Non-2xx responses are returned as [`crate::HttpOutcome`] values.

use thiserror::Error;

/// Errors raised by the HTTP client.
#[derive(Error, Debug)]
pub enum HttpClientError {
    /// Client configuration is unusable
    #[error("Invalid HTTP client configuration: {0}")]
    InvalidConfig(String),

    /// Target could not be turned into a URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Transport failure (connect, TLS, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Result type for HTTP client operations.
pub type HttpResult<T> = Result<T, HttpClientError>;

impl HttpClientError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Check if the failure was a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_timeout())
    }
}
