//! Response classification.

use crate::error::{ErrorKind, RestError};
use sdk_http_client::HttpOutcome;
use serde_json::Value;

/// Status codes with a dedicated classification.
#[derive(Debug, Clone, Copy)]
pub struct HttpStatusCode;

impl HttpStatusCode {
    /// 200
    pub const OK: u16 = 200;
    /// 400
    pub const BAD_REQUEST: u16 = 400;
    /// 401
    pub const UNAUTHORIZED: u16 = 401;
    /// 403
    pub const FORBIDDEN: u16 = 403;
    /// 404
    pub const NOT_FOUND: u16 = 404;
    /// 409
    pub const CONFLICT: u16 = 409;
    /// 410
    pub const GONE: u16 = 410;
    /// 500
    pub const INTERNAL_SERVER: u16 = 500;
}

/// Map an outcome to its body or a classified error.
///
/// Total over every status: 200 returns the body unchanged, anything else
/// yields exactly one [`ErrorKind`]. The message is `body.message` when it is
/// a string, otherwise a non-empty string body, otherwise
/// `"<Kind> (HTTP <status>)"`.
///
/// # Errors
///
/// Returns a [`RestError`] for every status other than 200.
///
/// # Examples
///
/// ```
/// use sdk_http_client::HttpOutcome;
/// use sdk_rest_client::classify;
/// use serde_json::json;
///
/// let outcome = HttpOutcome::new(409, json!({ "message": "taken" }));
/// let err = classify(outcome).unwrap_err();
/// assert_eq!(err.name(), "Conflict");
/// assert_eq!(err.message(), "taken");
/// ```
pub fn classify(outcome: HttpOutcome) -> Result<Value, RestError> {
    if outcome.status == HttpStatusCode::OK {
        return Ok(outcome.body);
    }

    let kind = ErrorKind::from_status(outcome.status);
    let message = extract_message(&outcome.body)
        .unwrap_or_else(|| format!("{kind} (HTTP {})", outcome.status));

    Err(RestError::new(outcome.status, message))
}

fn extract_message(body: &Value) -> Option<String> {
    match body {
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}
