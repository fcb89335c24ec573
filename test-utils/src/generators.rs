//! Shared proptest generators.

use proptest::prelude::*;
use serde_json::{Map, Value};

/// Status codes with a dedicated error kind, paired with the kind name.
pub const CLASSIFIED_STATUSES: [(u16, &str); 6] = [
    (400, "BadRequest"),
    (401, "Unauthorized"),
    (403, "Forbidden"),
    (404, "NotFound"),
    (409, "Conflict"),
    (410, "Gone"),
];

/// Generate a classified status code with its expected kind name.
pub fn classified_status_strategy() -> impl Strategy<Value = (u16, &'static str)> {
    proptest::sample::select(CLASSIFIED_STATUSES.to_vec())
}

/// Generate any status code that is neither 200 nor classified.
pub fn unexpected_status_strategy() -> impl Strategy<Value = u16> {
    any::<u16>().prop_filter("classified or success status", |status| {
        *status != 200 && !CLASSIFIED_STATUSES.iter().any(|(code, _)| code == status)
    })
}

/// Generate human readable error messages.
pub fn message_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 .,'-]{0,80}"
}

/// Generate valid database and collection names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,30}"
}

/// Generate usernames.
pub fn username_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{2,20}"
}

/// Generate passwords.
pub fn password_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9!@#$%^&*]{8,32}"
}

/// Generate scalar JSON values.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,20}".prop_map(Value::String),
        Just(Value::Null),
    ]
}

/// Generate flat documents without reserved field names.
pub fn document_strategy() -> impl Strategy<Value = Map<String, Value>> {
    proptest::collection::btree_map("[a-z][a-zA-Z0-9]{0,10}", scalar_strategy(), 0..8).prop_map(
        |fields| {
            fields
                .into_iter()
                .filter(|(key, _)| !matches!(key.as_str(), "createdAt" | "updatedAt"))
                .collect()
        },
    )
}
