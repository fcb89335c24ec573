//! Documents, operation options and operation results.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// A stored document.
pub type Document = Map<String, Value>;

/// Primary key field.
pub const ID_FIELD: &str = "_id";

/// Creation timestamp field written by [`crate::BaseDao`].
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Modification timestamp field written by [`crate::BaseDao`].
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Render a timestamp the way documents store it: RFC 3339, millisecond
/// precision, `Z` suffix.
#[must_use]
pub fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// Options for `find`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Documents to skip
    pub skip: Option<u64>,
    /// Maximum documents to return
    pub limit: Option<u64>,
    /// Field and direction to sort by
    pub sort: Option<(String, SortOrder)>,
}

impl FindOptions {
    /// Set the number of documents to skip.
    #[must_use]
    pub const fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the maximum number of documents.
    #[must_use]
    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sort by a (possibly dotted) field.
    #[must_use]
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }
}

/// Options for `update_one` / `update_many`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a document built from the filter when nothing matches
    pub upsert: bool,
}

impl UpdateOptions {
    /// Options with upsert enabled.
    #[must_use]
    pub const fn upsert() -> Self {
        Self { upsert: true }
    }
}

/// Options for `create_collection`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateCollectionOptions {
    /// Bounded collection that evicts the oldest documents
    pub capped: bool,
    /// Document bound for capped collections
    pub max_documents: Option<u64>,
}

impl CreateCollectionOptions {
    /// Capped collection holding at most `max_documents`.
    #[must_use]
    pub const fn capped(max_documents: u64) -> Self {
        Self {
            capped: true,
            max_documents: Some(max_documents),
        }
    }
}

/// Result of `insert_one`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOneResult {
    /// `_id` of the inserted document
    pub inserted_id: Value,
}

/// Result of `insert_many`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertManyResult {
    /// `_id`s in insertion order
    pub inserted_ids: Vec<Value>,
}

/// Result of `update_one` / `update_many`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents matching the filter
    pub matched_count: u64,
    /// Documents actually changed
    pub modified_count: u64,
    /// `_id` of the upserted document, if any
    pub upserted_id: Option<Value>,
}

impl UpdateResult {
    /// 1 when the update inserted a document, else 0.
    #[must_use]
    pub const fn upserted_count(&self) -> u64 {
        if self.upserted_id.is_some() { 1 } else { 0 }
    }
}

/// Result of `delete_one` / `delete_many`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    /// Documents removed
    pub deleted_count: u64,
}
