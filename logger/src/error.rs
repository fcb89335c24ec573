//! Logger error types.

use thiserror::Error;

/// Errors raised while configuring logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoggerError {
    /// The supplied level name is not one of the accepted values
    #[error("Unknown log level '{value}'. Acceptable values: {accepted}")]
    UnknownLevel {
        /// The rejected value
        value: String,
        /// Comma separated list of accepted names
        accepted: String,
    },

    /// A global subscriber could not be installed
    #[error("Failed to initialise tracing: {0}")]
    Init(String),
}

/// Result type for logger operations.
pub type LoggerResult<T> = Result<T, LoggerError>;

impl LoggerError {
    /// Create an unknown level error for the given value.
    #[must_use]
    pub fn unknown_level(value: impl Into<String>) -> Self {
        Self::UnknownLevel {
            value: value.into(),
            accepted: crate::level::ACCEPTED_LEVELS.join(","),
        }
    }
}
