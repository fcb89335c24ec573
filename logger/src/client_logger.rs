//! Namespaced client loggers.

use crate::level::{ServiceLogLevel, is_level_enabled, log_level};
use std::fmt::Display;
use std::sync::Arc;

/// Root namespace every client logger is nested under.
pub const ROOT_NAMESPACE: &str = "service-sdk";

/// A logger scoped to one SDK component.
///
/// Messages are forwarded to `tracing` with a `namespace` field, but only when
/// the process-wide [`ServiceLogLevel`] is set and at least as verbose as the
/// message. With no level configured the logger is silent.
#[derive(Debug, Clone)]
pub struct ClientLogger {
    namespace: Arc<str>,
}

impl ClientLogger {
    /// Create a logger for the given component namespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use sdk_logger::ClientLogger;
    ///
    /// let logger = ClientLogger::new("DbClient");
    /// assert_eq!(logger.namespace(), "service-sdk:DbClient");
    /// ```
    #[must_use]
    pub fn new(namespace: impl AsRef<str>) -> Self {
        Self {
            namespace: Arc::from(format!("{ROOT_NAMESPACE}:{}", namespace.as_ref())),
        }
    }

    /// Fully qualified namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether a message at `level` would currently be emitted.
    #[must_use]
    pub fn is_enabled(&self, level: ServiceLogLevel) -> bool {
        is_level_enabled(level, log_level())
    }

    /// Log a detailed troubleshooting message.
    pub fn verbose(&self, message: impl Display) {
        self.log(ServiceLogLevel::Verbose, message);
    }

    /// Log a message about normal operation.
    pub fn info(&self, message: impl Display) {
        self.log(ServiceLogLevel::Info, message);
    }

    /// Log a message about a failed task.
    pub fn warning(&self, message: impl Display) {
        self.log(ServiceLogLevel::Warning, message);
    }

    /// Log an unrecoverable failure.
    pub fn error(&self, message: impl Display) {
        self.log(ServiceLogLevel::Error, message);
    }

    /// Log a message at the given level.
    pub fn log(&self, level: ServiceLogLevel, message: impl Display) {
        if !self.is_enabled(level) {
            return;
        }

        let namespace = &*self.namespace;
        match level {
            ServiceLogLevel::Verbose => tracing::debug!(namespace, "{message}"),
            ServiceLogLevel::Info => tracing::info!(namespace, "{message}"),
            ServiceLogLevel::Warning => tracing::warn!(namespace, "{message}"),
            ServiceLogLevel::Error => tracing::error!(namespace, "{message}"),
        }
    }
}
