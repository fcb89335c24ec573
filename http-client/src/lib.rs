//! HTTP client returning a uniform outcome for every completed call.
//!
//! This crate provides:
//! - [`HttpClientConfig`] with a required base URL and a bounded default timeout
//! - [`HttpClient`], a reqwest wrapper that never fails on non-2xx statuses
//! - [`HttpTransport`], the seam REST clients are generic over
//! - Query serialisation that repeats keys for arrays (`a=1&a=2`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod request;

pub use client::{HttpClient, HttpTransport};
pub use config::{HttpClientConfig, build_http_client};
pub use error::{HttpClientError, HttpResult};
pub use query::encode_query;
pub use request::{HttpMethod, HttpOutcome, RequestOptions};
