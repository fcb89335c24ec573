//! Query string serialisation.
//!
//! Arrays repeat their key without index markers (`a=1&a=2`), nested objects
//! use bracketed keys (`a[b]=c`) and `null` serialises as an empty value.

use serde_json::{Map, Value};
use url::form_urlencoded::Serializer;

/// Serialise query parameters into an `application/x-www-form-urlencoded` string.
///
/// # Examples
///
/// ```
/// use sdk_http_client::encode_query;
/// use serde_json::json;
///
/// let params = json!({ "a": [1, 2] });
/// assert_eq!(encode_query(params.as_object().unwrap()), "a=1&a=2");
/// ```
#[must_use]
pub fn encode_query(params: &Map<String, Value>) -> String {
    let mut serializer = Serializer::new(String::new());
    for (key, value) in params {
        append_value(&mut serializer, key, value);
    }
    serializer.finish()
}

fn append_value(serializer: &mut Serializer<'_, String>, key: &str, value: &Value) {
    match value {
        Value::Null => {
            serializer.append_pair(key, "");
        }
        Value::Bool(b) => {
            serializer.append_pair(key, if *b { "true" } else { "false" });
        }
        Value::Number(n) => {
            serializer.append_pair(key, &n.to_string());
        }
        Value::String(s) => {
            serializer.append_pair(key, s);
        }
        Value::Array(items) => {
            for item in items {
                append_value(serializer, key, item);
            }
        }
        Value::Object(fields) => {
            for (child, item) in fields {
                append_value(serializer, &format!("{key}[{child}]"), item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: &Value) -> String {
        encode_query(value.as_object().unwrap())
    }

    #[test]
    fn test_arrays_have_no_indices() {
        assert_eq!(encode(&json!({ "a": [1, 2] })), "a=1&a=2");
        assert_eq!(encode(&json!({ "tag": ["x", "y", "z"] })), "tag=x&tag=y&tag=z");
    }

    #[test]
    fn test_scalars() {
        assert_eq!(
            encode(&json!({ "active": true, "limit": 10, "name": "root" })),
            "active=true&limit=10&name=root"
        );
    }

    #[test]
    fn test_null_and_empty_array() {
        assert_eq!(encode(&json!({ "a": null })), "a=");
        assert_eq!(encode(&json!({ "a": [] })), "");
    }

    #[test]
    fn test_nested_object() {
        assert_eq!(encode(&json!({ "filter": { "age": 3 } })), "filter%5Bage%5D=3");
    }

    #[test]
    fn test_reserved_characters_are_escaped() {
        assert_eq!(encode(&json!({ "q": "a&b=c" })), "q=a%26b%3Dc");
    }
}
