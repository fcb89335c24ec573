//! Request execution.

use crate::config::{HttpClientConfig, build_http_client};
use crate::error::HttpResult;
use crate::query::encode_query;
use crate::request::{HttpMethod, HttpOutcome, RequestOptions};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

/// Performs a call and returns its outcome regardless of status.
///
/// Implementations must only fail when no response was received.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a request against `target`.
    async fn perform(&self, target: &str, options: RequestOptions) -> HttpResult<HttpOutcome>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn perform(&self, target: &str, options: RequestOptions) -> HttpResult<HttpOutcome> {
        (**self).perform(target, options).await
    }
}

/// HTTP client built on reqwest.
///
/// Every completed response, whatever its status, is returned as an
/// [`HttpOutcome`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    config: HttpClientConfig,
    base_url: Url,
    http: Client,
}

impl HttpClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is missing or invalid, or if the
    /// underlying client cannot be built.
    pub fn new(config: HttpClientConfig) -> HttpResult<Self> {
        let base_url = config.parsed_base_url()?;
        let http = build_http_client(&config)?;

        Ok(Self {
            config,
            base_url,
            http,
        })
    }

    /// The client configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Resolve a target and query parameters into a full URL.
    ///
    /// Relative targets are appended to the base URL; `http://` and
    /// `https://` targets are used as is.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting URL does not parse.
    pub fn resolve_url(&self, target: &str, params: &Map<String, Value>) -> HttpResult<Url> {
        let mut url = if target.starts_with("http://") || target.starts_with("https://") {
            Url::parse(target)?
        } else {
            let base = self.base_url.as_str().trim_end_matches('/');
            let path = target.trim_start_matches('/');
            if path.is_empty() {
                Url::parse(base)?
            } else {
                Url::parse(&format!("{base}/{path}"))?
            }
        };

        let query = encode_query(params);
        if !query.is_empty() {
            let combined = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
                _ => query,
            };
            url.set_query(Some(&combined));
        }

        Ok(url)
    }

    /// Perform a request.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response was received (invalid URL,
    /// connection failure, timeout, unreadable body).
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn request(&self, target: &str, options: RequestOptions) -> HttpResult<HttpOutcome> {
        let url = self.resolve_url(target, &options.params)?;

        let headers = merge_headers(&self.config.headers, options.headers);

        let mut request = self.http.request(options.method.into(), url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let bytes = response.bytes().await?;

        debug!(status, "HTTP request completed");

        Ok(HttpOutcome {
            status,
            headers,
            body: HttpOutcome::parse_body(&bytes),
        })
    }

    /// Perform a GET request.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn get(&self, target: &str, options: RequestOptions) -> HttpResult<HttpOutcome> {
        self.request(target, options.with_method(HttpMethod::Get)).await
    }

    /// Perform a DELETE request.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn delete(&self, target: &str, options: RequestOptions) -> HttpResult<HttpOutcome> {
        self.request(target, options.with_method(HttpMethod::Delete)).await
    }

    /// Perform a POST request.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn post(&self, target: &str, options: RequestOptions) -> HttpResult<HttpOutcome> {
        self.request(target, options.with_method(HttpMethod::Post)).await
    }

    /// Perform a PUT request.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn put(&self, target: &str, options: RequestOptions) -> HttpResult<HttpOutcome> {
        self.request(target, options.with_method(HttpMethod::Put)).await
    }

    /// Perform a PATCH request.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn patch(&self, target: &str, options: RequestOptions) -> HttpResult<HttpOutcome> {
        self.request(target, options.with_method(HttpMethod::Patch)).await
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn perform(&self, target: &str, options: RequestOptions) -> HttpResult<HttpOutcome> {
        self.request(target, options).await
    }
}

/// Overlay per-request headers on the configured defaults.
///
/// Header names are case-insensitive, so keys are lowercased before merging
/// and a request header replaces a default that differs only in case.
fn merge_headers(
    defaults: &HashMap<String, String>,
    overrides: HashMap<String, String>,
) -> HashMap<String, String> {
    defaults
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
        .chain(
            overrides
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value)),
        )
        .collect()
}

fn collect_headers(map: &HeaderMap) -> HashMap<String, String> {
    let mut headers: HashMap<String, String> = HashMap::new();
    for (name, value) in map {
        let Ok(value) = value.to_str() else {
            continue;
        };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn client(base: &str) -> HttpClient {
        HttpClient::new(HttpClientConfig::new(base)).unwrap()
    }

    #[test]
    fn test_requires_base_url() {
        assert!(HttpClient::new(HttpClientConfig::default()).is_err());
    }

    #[test]
    fn test_resolve_relative_target() {
        let client = client("http://localhost:5000");
        let url = client.resolve_url("/status", &Map::new()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/status");
    }

    #[test]
    fn test_resolve_keeps_base_path() {
        let client = client("http://localhost:5000/api/v1/");
        let url = client.resolve_url("users", &Map::new()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/v1/users");
    }

    #[test]
    fn test_resolve_absolute_target() {
        let client = client("http://localhost:5000");
        let url = client
            .resolve_url("https://example.com/health", &Map::new())
            .unwrap();
        assert_eq!(url.as_str(), "https://example.com/health");
    }

    #[test]
    fn test_resolve_appends_query() {
        let client = client("http://localhost:5000");
        let params = json!({ "id": [1, 2] });
        let url = client
            .resolve_url("/users?active=true", params.as_object().unwrap())
            .unwrap();
        assert_eq!(url.query(), Some("active=true&id=1&id=2"));
    }

    #[test]
    fn test_merge_headers_ignores_name_case() {
        let defaults = HashMap::from([
            ("Authorization".to_string(), "Bearer default".to_string()),
            ("X-Api-Key".to_string(), "abc".to_string()),
        ]);
        let overrides = HashMap::from([("authorization".to_string(), "Bearer call".to_string())]);

        let merged = merge_headers(&defaults, overrides);
        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged.get("authorization").map(String::as_str),
            Some("Bearer call")
        );
        assert_eq!(merged.get("x-api-key").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_collect_headers_joins_values() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        map.insert("content-type", HeaderValue::from_static("application/json"));

        let headers = collect_headers(&map);
        assert_eq!(headers.get("set-cookie").map(String::as_str), Some("a=1, b=2"));
        assert_eq!(
            headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
    }
}
