//! Test fixtures with sample data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// Message returned by the sample conflict endpoint.
pub const CONFLICT_MESSAGE: &str = "The username root-user is already taken";

/// A sample user account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SampleUser {
    /// Login name
    pub username: String,
    /// Plain-text password
    pub password: String,
    /// Contact email
    pub email: String,
}

impl SampleUser {
    /// The root user used in REST scenarios.
    #[must_use]
    pub fn root() -> Self {
        Self {
            username: "root-user".to_string(),
            password: "Hgc9057AB".to_string(),
            email: "root@example.com".to_string(),
        }
    }

    /// A regular user.
    #[must_use]
    pub fn alice() -> Self {
        Self {
            username: "alice".to_string(),
            password: "correct horse battery staple".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    /// Stored form of the user with the given password hash.
    #[must_use]
    pub fn to_document(&self, password_hash: &str) -> Map<String, Value> {
        document(json!({
            "username": self.username,
            "email": self.email,
            "credentials": { "password": password_hash },
        }))
    }
}

/// Convert a JSON object literal into a document.
///
/// # Panics
///
/// Panics if `value` is not an object.
#[must_use]
pub fn document(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(fields) => fields,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Environment with a complete set of database connection variables.
#[must_use]
pub fn sample_db_env() -> HashMap<String, String> {
    HashMap::from([
        ("DB_USERNAME".to_string(), "svc-user".to_string()),
        ("DB_PASSWORD".to_string(), "s3cr3t".to_string()),
        ("DB_HOST_URI".to_string(), "cluster0.example.net".to_string()),
    ])
}

/// Build an environment lookup function over a fixed map.
pub fn env_lookup(vars: HashMap<String, String>) -> impl Fn(&str) -> Option<String> {
    move |key: &str| vars.get(key).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_document() {
        let doc = SampleUser::alice().to_document("salt:key");
        assert_eq!(doc["username"], "alice");
        assert_eq!(doc["credentials"]["password"], "salt:key");
    }

    #[test]
    fn test_env_lookup() {
        let lookup = env_lookup(sample_db_env());
        assert_eq!(lookup("DB_USERNAME").as_deref(), Some("svc-user"));
        assert_eq!(lookup("DB_AUTH_SOURCE"), None);
    }
}
