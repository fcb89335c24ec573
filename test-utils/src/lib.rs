//! Shared test utilities for the service SDK crates.
//!
//! This crate provides:
//! - Proptest generators for status codes, names and documents
//! - A scripted mock HTTP transport
//! - Test fixtures with sample data

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
