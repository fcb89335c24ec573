//! Namespaced client loggers for the service SDK crates.
//!
//! This crate provides:
//! - A process-wide service log level (`verbose`, `info`, `warning`, `error`)
//!   initialised from `SERVICE_LOG_LEVEL`
//! - [`ClientLogger`], a cheap namespaced handle that emits `tracing` events
//!   only when the process level enables them
//! - Subscriber initialisation with plain or JSON output

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client_logger;
pub mod error;
pub mod level;
pub mod tracing_config;

pub use client_logger::ClientLogger;
pub use error::{LoggerError, LoggerResult};
pub use level::{ServiceLogLevel, is_level_enabled, log_level, set_log_level};
pub use tracing_config::{TracingConfig, init_tracing};
