//! Service log levels and the process-wide level setting.

use crate::error::{LoggerError, LoggerResult};
use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Environment variable read on first use of the process level.
pub const SERVICE_LOG_LEVEL_ENV: &str = "SERVICE_LOG_LEVEL";

/// Accepted level names, most verbose first.
pub const ACCEPTED_LEVELS: [&str; 4] = ["verbose", "info", "warning", "error"];

/// Log levels supported by client loggers.
///
/// Ordered by verbosity: `Error < Warning < Info < Verbose`. A message is
/// emitted when its level is less than or equal to the configured level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceLogLevel {
    /// Failures the program is unlikely to recover from
    Error,
    /// A function failed to perform its intended task
    Warning,
    /// Normal operation
    Info,
    /// Detailed troubleshooting output
    Verbose,
}

impl ServiceLogLevel {
    /// Level name as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Verbose => "verbose",
        }
    }

    /// The `tracing` level events of this level are emitted at.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warning => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Verbose => tracing::Level::DEBUG,
        }
    }

    /// `EnvFilter` directive that lets this level through.
    #[must_use]
    pub const fn as_filter_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warn",
            Self::Info => "info",
            Self::Verbose => "debug",
        }
    }

    const fn encode(level: Option<Self>) -> u8 {
        match level {
            None => 0,
            Some(Self::Error) => 1,
            Some(Self::Warning) => 2,
            Some(Self::Info) => 3,
            Some(Self::Verbose) => 4,
        }
    }

    const fn decode(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Info),
            4 => Some(Self::Verbose),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceLogLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> LoggerResult<Self> {
        match s {
            "verbose" => Ok(Self::Verbose),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(LoggerError::unknown_level(other)),
        }
    }
}

static LOG_LEVEL: Lazy<AtomicU8> =
    Lazy::new(|| AtomicU8::new(ServiceLogLevel::encode(read_level_from_env())));

fn read_level_from_env() -> Option<ServiceLogLevel> {
    let raw = std::env::var(SERVICE_LOG_LEVEL_ENV).ok()?;
    if raw.is_empty() {
        return None;
    }

    match raw.parse() {
        Ok(level) => Some(level),
        Err(_) => {
            // No subscriber can be assumed this early.
            eprintln!(
                "{SERVICE_LOG_LEVEL_ENV} set to unknown log level '{raw}'; logging is not enabled. Acceptable values: {}.",
                ACCEPTED_LEVELS.join(", ")
            );
            None
        }
    }
}

/// Set the process-wide service log level. `None` disables client loggers.
pub fn set_log_level(level: Option<ServiceLogLevel>) {
    LOG_LEVEL.store(ServiceLogLevel::encode(level), Ordering::SeqCst);
}

/// The currently configured service log level.
#[must_use]
pub fn log_level() -> Option<ServiceLogLevel> {
    ServiceLogLevel::decode(LOG_LEVEL.load(Ordering::SeqCst))
}

/// Whether a message at `level` passes the `configured` process level.
#[must_use]
pub fn is_level_enabled(level: ServiceLogLevel, configured: Option<ServiceLogLevel>) -> bool {
    configured.is_some_and(|configured| level <= configured)
}
