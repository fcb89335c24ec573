//! REST client with status-code driven error classification.
//!
//! Responses with status 200 yield their body; every other status maps to
//! exactly one [`ErrorKind`]. Transport failures are reported separately and
//! are never classified.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod classify;
pub mod client;
pub mod error;

pub use auth::{
    AccessToken, CredentialError, GetTokenOptions, StaticTokenCredential, TokenCredential,
};
pub use classify::{HttpStatusCode, classify};
pub use client::RestClient;
pub use error::{ErrorKind, RestClientError, RestError, RestResult};
