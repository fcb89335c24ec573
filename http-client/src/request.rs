//! Request options and the uniform response outcome.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// HTTP methods supported by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    #[default]
    Get,
    /// DELETE
    Delete,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
}

impl HttpMethod {
    /// Method name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Delete => "DELETE",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Delete => Self::DELETE,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Patch => Self::PATCH,
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Method (default: GET)
    pub method: HttpMethod,
    /// Query parameters, see [`crate::encode_query`]
    pub params: Map<String, Value>,
    /// Extra headers for this request
    pub headers: HashMap<String, String>,
    /// JSON body
    pub body: Option<Value>,
}

impl RequestOptions {
    /// Create options for the given method.
    #[must_use]
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// Replace the method.
    #[must_use]
    pub const fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Uniform result of a completed HTTP call.
///
/// Produced for every status code; callers branch on `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpOutcome {
    /// Status code
    pub status: u16,
    /// Response headers, multi-valued headers joined with `", "`
    pub headers: HashMap<String, String>,
    /// Body parsed as JSON; `null` when empty, a JSON string when not JSON
    pub body: Value,
}

impl HttpOutcome {
    /// Create an outcome with no headers.
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Interpret raw body bytes the way the client does.
    #[must_use]
    pub fn parse_body(bytes: &[u8]) -> Value {
        if bytes.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_conversion() {
        assert_eq!(reqwest::Method::from(HttpMethod::Patch), reqwest::Method::PATCH);
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_options_builder() {
        let options = RequestOptions::new(HttpMethod::Post)
            .with_param("page", 2)
            .with_header("x-request-id", "abc")
            .with_body(json!({ "username": "root-user" }));

        assert_eq!(options.method, HttpMethod::Post);
        assert_eq!(options.params.get("page"), Some(&json!(2)));
        assert_eq!(options.headers.get("x-request-id").map(String::as_str), Some("abc"));
        assert_eq!(options.body, Some(json!({ "username": "root-user" })));
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(HttpOutcome::parse_body(b""), Value::Null);
        assert_eq!(HttpOutcome::parse_body(br#"{"message":"OK"}"#), json!({ "message": "OK" }));
        assert_eq!(HttpOutcome::parse_body(b"plain text"), json!("plain text"));
    }

    #[test]
    fn test_is_success() {
        assert!(HttpOutcome::new(200, Value::Null).is_success());
        assert!(HttpOutcome::new(204, Value::Null).is_success());
        assert!(!HttpOutcome::new(409, Value::Null).is_success());
    }
}
