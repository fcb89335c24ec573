//! Tracing subscriber initialisation.

use crate::error::{LoggerError, LoggerResult};
use crate::level::{ServiceLogLevel, log_level};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name recorded when tracing starts
    pub service_name: String,
    /// Level used for the default filter directive when `RUST_LOG` is unset
    pub log_level: ServiceLogLevel,
    /// Whether to output JSON format
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "service-sdk".to_string(),
            log_level: log_level().unwrap_or(ServiceLogLevel::Info),
            json_output: false,
        }
    }
}

impl TracingConfig {
    /// Create config with custom service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Create config with custom log level.
    #[must_use]
    pub const fn with_log_level(mut self, level: ServiceLogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Enable JSON output.
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_level.as_filter_directive()))
    }
}

/// Install the global tracing subscriber.
///
/// Should be called once at application startup.
///
/// # Errors
///
/// Returns [`LoggerError::Init`] if a global subscriber is already installed.
pub fn init_tracing(config: &TracingConfig) -> LoggerResult<()> {
    let filter = config.env_filter();

    let result = if config.json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };
    result.map_err(|e| LoggerError::Init(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        "Tracing initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = TracingConfig::default()
            .with_service_name("user-api")
            .with_log_level(ServiceLogLevel::Verbose)
            .with_json_output();

        assert_eq!(config.service_name, "user-api");
        assert_eq!(config.log_level, ServiceLogLevel::Verbose);
        assert!(config.json_output);
    }

    #[test]
    fn test_second_init_fails() {
        let config = TracingConfig::default();
        let _ = init_tracing(&config);

        assert!(matches!(init_tracing(&config), Err(LoggerError::Init(_))));
    }
}
