//! Document store capability.
//!
//! [`DocumentStore`] is the seam between the connection manager and the
//! driver that talks to the server. [`crate::MemoryStore`] implements it in
//! process.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreResult;
use crate::model::{
    CreateCollectionOptions, DeleteResult, Document, FindOptions, InsertManyResult,
    InsertOneResult, UpdateOptions, UpdateResult,
};

/// Lazy, finite, single-pass sequence of documents.
pub type DocumentStream = BoxStream<'static, StoreResult<Document>>;

/// Unbounded sequence of change events for one collection.
pub type ChangeStream = BoxStream<'static, ChangeEvent>;

/// Database and collection pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    /// Database name
    pub db: String,
    /// Collection name
    pub coll: String,
}

impl Namespace {
    /// Create a namespace.
    #[must_use]
    pub fn new(db: impl Into<String>, coll: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            coll: coll.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.coll)
    }
}

/// Kind of change reported by a change stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationType {
    /// Document inserted
    Insert,
    /// Document updated in place
    Update,
    /// Document replaced
    Replace,
    /// Document deleted
    Delete,
    /// Collection dropped
    Drop,
}

/// Change reported by [`DocumentStore::watch`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// What happened
    pub operation_type: OperationType,
    /// Where it happened
    pub ns: Namespace,
    /// `{ "_id": ... }` of the affected document
    pub document_key: Option<Value>,
    /// Document after the change, for inserts and updates
    pub full_document: Option<Document>,
    /// When it happened
    pub cluster_time: DateTime<Utc>,
}

/// Operations the connection manager and accessors need from a driver.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Perform the connection handshake.
    async fn connect(&self) -> StoreResult<()>;

    /// Whether a handshake has completed and the store is not closed.
    fn is_connected(&self) -> bool;

    /// Close the connection.
    async fn close(&self) -> StoreResult<()>;

    /// Collection names in a database, sorted.
    async fn list_collection_names(&self, db: &str) -> StoreResult<Vec<String>>;

    /// Create a collection; fails if it exists.
    async fn create_collection(
        &self,
        ns: &Namespace,
        options: &CreateCollectionOptions,
    ) -> StoreResult<()>;

    /// Drop a collection, returning whether it existed.
    async fn drop_collection(&self, ns: &Namespace) -> StoreResult<bool>;

    /// Count documents matching a filter.
    async fn count_documents(&self, ns: &Namespace, filter: &Document) -> StoreResult<u64>;

    /// Stream documents matching a filter.
    async fn find(
        &self,
        ns: &Namespace,
        filter: &Document,
        options: &FindOptions,
    ) -> StoreResult<DocumentStream>;

    /// Insert one document, assigning `_id` when absent.
    async fn insert_one(&self, ns: &Namespace, document: Document) -> StoreResult<InsertOneResult>;

    /// Insert documents in order.
    async fn insert_many(
        &self,
        ns: &Namespace,
        documents: Vec<Document>,
    ) -> StoreResult<InsertManyResult>;

    /// Apply an update document to the first match.
    async fn update_one(
        &self,
        ns: &Namespace,
        filter: &Document,
        update: &Document,
        options: &UpdateOptions,
    ) -> StoreResult<UpdateResult>;

    /// Apply an update document to every match.
    async fn update_many(
        &self,
        ns: &Namespace,
        filter: &Document,
        update: &Document,
        options: &UpdateOptions,
    ) -> StoreResult<UpdateResult>;

    /// Delete the first match.
    async fn delete_one(&self, ns: &Namespace, filter: &Document) -> StoreResult<DeleteResult>;

    /// Delete every match.
    async fn delete_many(&self, ns: &Namespace, filter: &Document) -> StoreResult<DeleteResult>;

    /// Subscribe to changes in a collection.
    async fn watch(&self, ns: &Namespace) -> StoreResult<ChangeStream>;
}
