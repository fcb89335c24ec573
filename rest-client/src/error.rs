//! Classified REST errors.

use crate::auth::CredentialError;
use sdk_http_client::HttpClientError;
use std::fmt;
use thiserror::Error;

/// Closed set of error categories derived from a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 409
    Conflict,
    /// 410
    Gone,
    /// Any other non-200 status
    Unexpected,
}

impl ErrorKind {
    /// Map a non-success status code to its kind.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            410 => Self::Gone,
            _ => Self::Unexpected,
        }
    }

    /// Stable name for programmatic branching.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BadRequest => "BadRequest",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::Gone => "Gone",
            Self::Unexpected => "Unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error produced from a completed response with a non-200 status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct RestError {
    kind: ErrorKind,
    message: String,
    http_code: u16,
}

impl RestError {
    /// Create an error for the given status.
    #[must_use]
    pub fn new(http_code: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::from_status(http_code),
            message: message.into(),
            http_code,
        }
    }

    /// The error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Kind name (`"Conflict"`, `"NotFound"`, ...).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Message taken from the response body.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The originating status code.
    #[must_use]
    pub const fn http_code(&self) -> u16 {
        self.http_code
    }

    /// Classified errors are expected failures, never programmer errors.
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        true
    }
}

/// Errors returned by [`crate::RestClient`].
#[derive(Error, Debug)]
pub enum RestClientError {
    /// No response was received
    #[error(transparent)]
    Http(#[from] HttpClientError),

    /// Response status was not 200
    #[error(transparent)]
    Classified(#[from] RestError),

    /// Token could not be obtained
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Body did not match the requested type
    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Result type for REST client operations.
pub type RestResult<T> = Result<T, RestClientError>;

impl RestClientError {
    /// The classified error, if the call completed with a non-200 status.
    #[must_use]
    pub const fn as_classified(&self) -> Option<&RestError> {
        match self {
            Self::Classified(e) => Some(e),
            _ => None,
        }
    }
}
