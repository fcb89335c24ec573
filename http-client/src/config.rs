//! HTTP client configuration and building.

use crate::error::{HttpClientError, HttpResult};
use reqwest::{Client, ClientBuilder};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// HTTP client configuration.
///
/// `base_url` is required; every request target is resolved against it.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL requests are resolved against
    pub base_url: String,
    /// Request timeout (default: 3s)
    pub timeout: Duration,
    /// Connection timeout (default: 3s)
    pub connect_timeout: Duration,
    /// Headers sent with every request
    pub headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(3),
            headers: HashMap::new(),
            user_agent: concat!("service-sdk/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientConfig {
    /// Create a config for the given base URL with default settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validate and parse the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::InvalidConfig`] if the base URL is empty, or
    /// [`HttpClientError::InvalidUrl`] if it does not parse.
    pub fn parsed_base_url(&self) -> HttpResult<Url> {
        if self.base_url.trim().is_empty() {
            return Err(HttpClientError::invalid_config("must contain a base URL"));
        }
        Ok(Url::parse(&self.base_url)?)
    }
}

/// Build a configured reqwest client.
///
/// Creates a client with rustls TLS and the configured timeouts and user
/// agent. Non-2xx statuses are never turned into errors by reqwest itself.
///
/// # Errors
///
/// Returns an error if the client cannot be built (e.g., TLS initialization fails).
pub fn build_http_client(config: &HttpClientConfig) -> Result<Client, reqwest::Error> {
    ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .build()
}
