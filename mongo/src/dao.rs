//! Resource accessor over one collection.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::instrument;

use crate::client::DbClient;
use crate::database::{Collection, Database};
use crate::error::DbResult;
use crate::model::{
    CREATED_AT_FIELD, CreateCollectionOptions, Document, FindOptions, InsertOneResult,
    UPDATED_AT_FIELD, UpdateOptions, timestamp,
};
use crate::store::DocumentStream;

/// Accessor behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaoConfig {
    /// Maintain `createdAt` / `updatedAt` on writes
    pub use_timestamps: bool,
}

impl Default for DaoConfig {
    fn default() -> Self {
        Self {
            use_timestamps: true,
        }
    }
}

impl DaoConfig {
    /// Disable timestamp maintenance.
    #[must_use]
    pub const fn without_timestamps(mut self) -> Self {
        self.use_timestamps = false;
        self
    }
}

/// CRUD accessor bound to one database and collection.
///
/// Every operation connects through the shared [`DbClient`] first, so the
/// first call on a fresh client performs the handshake. Store errors are
/// returned unchanged.
#[derive(Debug, Clone)]
pub struct BaseDao {
    client: Arc<DbClient>,
    db_name: String,
    collection_name: String,
    config: DaoConfig,
}

impl BaseDao {
    /// Create an accessor.
    pub fn new(
        client: Arc<DbClient>,
        db_name: impl Into<String>,
        collection_name: impl Into<String>,
        config: DaoConfig,
    ) -> Self {
        Self {
            client,
            db_name: db_name.into(),
            collection_name: collection_name.into(),
            config,
        }
    }

    /// Database name.
    #[must_use]
    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Collection name.
    #[must_use]
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Accessor configuration.
    #[must_use]
    pub const fn config(&self) -> DaoConfig {
        self.config
    }

    /// Handle to the database.
    ///
    /// # Errors
    ///
    /// Propagates connection errors.
    pub async fn database(&self) -> DbResult<Database> {
        self.client.connect(&self.db_name).await
    }

    /// Handle to the collection.
    ///
    /// # Errors
    ///
    /// Propagates connection errors.
    pub async fn collection(&self) -> DbResult<Collection> {
        self.database().await?.collection(&self.collection_name)
    }

    /// Count documents matching `filter`, or all documents.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    #[instrument(skip(self, filter), fields(collection = %self.collection_name))]
    pub async fn count(&self, filter: Option<Document>) -> DbResult<u64> {
        self.collection()
            .await?
            .count_documents(&filter.unwrap_or_default())
            .await
    }

    /// Stream documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    #[instrument(skip(self, filter, options), fields(collection = %self.collection_name))]
    pub async fn find(&self, filter: Document, options: FindOptions) -> DbResult<DocumentStream> {
        self.collection().await?.find(&filter, &options).await
    }

    /// First document matching `filter`.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    #[instrument(skip(self, filter, options), fields(collection = %self.collection_name))]
    pub async fn find_one(
        &self,
        filter: Document,
        options: FindOptions,
    ) -> DbResult<Option<Document>> {
        self.collection().await?.find_one(&filter, &options).await
    }

    /// Insert one document, stamping `createdAt` and `updatedAt` when enabled.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    #[instrument(skip(self, document), fields(collection = %self.collection_name))]
    pub async fn insert_one(&self, mut document: Document) -> DbResult<InsertOneResult> {
        if self.config.use_timestamps {
            stamp_new(&mut document, &timestamp(Utc::now()));
        }
        self.collection().await?.insert_one(document).await
    }

    /// Insert documents, returning how many were inserted.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    #[instrument(skip(self, documents), fields(collection = %self.collection_name))]
    pub async fn insert_many(&self, mut documents: Vec<Document>) -> DbResult<u64> {
        if self.config.use_timestamps {
            let now = timestamp(Utc::now());
            for document in &mut documents {
                stamp_new(document, &now);
            }
        }
        let result = self.collection().await?.insert_many(documents).await?;
        Ok(u64::try_from(result.inserted_ids.len()).unwrap_or(u64::MAX))
    }

    /// Set the fields of `partial` on the first match.
    ///
    /// Returns modified plus upserted documents. `createdAt` is only written
    /// when the update inserts.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    #[instrument(skip(self, filter, partial), fields(collection = %self.collection_name))]
    pub async fn update_one(
        &self,
        filter: Document,
        partial: Document,
        options: UpdateOptions,
    ) -> DbResult<u64> {
        let update = self.update_document(partial);
        let result = self
            .collection()
            .await?
            .update_one(&filter, &update, &options)
            .await?;
        Ok(result.modified_count + result.upserted_count())
    }

    /// Set the fields of `partial` on every match, returning the modified count.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    #[instrument(skip(self, filter, partial), fields(collection = %self.collection_name))]
    pub async fn update_many(
        &self,
        filter: Document,
        partial: Document,
        options: UpdateOptions,
    ) -> DbResult<u64> {
        let update = self.update_document(partial);
        let result = self
            .collection()
            .await?
            .update_many(&filter, &update, &options)
            .await?;
        Ok(result.modified_count)
    }

    /// Delete the first match; true iff a document was removed.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    #[instrument(skip(self, filter), fields(collection = %self.collection_name))]
    pub async fn delete_one(&self, filter: Document) -> DbResult<bool> {
        let result = self.collection().await?.delete_one(&filter).await?;
        Ok(result.deleted_count == 1)
    }

    /// Delete every match; true iff at least one document was removed.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    #[instrument(skip(self, filter), fields(collection = %self.collection_name))]
    pub async fn delete_many(&self, filter: Document) -> DbResult<bool> {
        let result = self.collection().await?.delete_many(&filter).await?;
        Ok(result.deleted_count > 0)
    }

    /// Create a collection in this accessor's database.
    ///
    /// Returns `None` if it already exists. A concurrent creator racing this
    /// call surfaces as the store's `NamespaceExists` error.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    #[instrument(skip(self, options))]
    pub async fn create_collection(
        &self,
        name: &str,
        options: CreateCollectionOptions,
    ) -> DbResult<Option<Collection>> {
        let database = self.database().await?;
        if database
            .list_collection_names()
            .await?
            .iter()
            .any(|existing| existing == name)
        {
            return Ok(None);
        }
        database.create_collection(name, &options).await.map(Some)
    }

    /// Drop a collection in this accessor's database; false if it did not exist.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    #[instrument(skip(self))]
    pub async fn delete_collection(&self, name: &str) -> DbResult<bool> {
        self.database().await?.drop_collection(name).await
    }

    fn update_document(&self, mut partial: Document) -> Document {
        let mut update = Document::new();
        if self.config.use_timestamps {
            let now = timestamp(Utc::now());
            partial.remove(CREATED_AT_FIELD);
            partial.insert(UPDATED_AT_FIELD.to_string(), now.clone());
            let mut on_insert = Document::new();
            on_insert.insert(CREATED_AT_FIELD.to_string(), now);
            update.insert("$setOnInsert".to_string(), Value::Object(on_insert));
        }
        update.insert("$set".to_string(), Value::Object(partial));
        update
    }
}

fn stamp_new(document: &mut Document, now: &Value) {
    document.insert(CREATED_AT_FIELD.to_string(), now.clone());
    document.insert(UPDATED_AT_FIELD.to_string(), now.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, ConnectionSettings};
    use crate::error::{DbError, StoreError};
    use crate::memory::MemoryStore;
    use crate::model::SortOrder;
    use crate::store::DocumentStore;
    use futures::TryStreamExt;
    use serde_json::json;
    use test_utils::fixtures::{document, env_lookup, sample_db_env};

    fn dao_with(config: DaoConfig) -> (Arc<MemoryStore>, BaseDao) {
        let store = Arc::new(MemoryStore::new());
        let env = env_lookup(sample_db_env());
        let connection =
            ConnectionConfig::resolve_with(ConnectionSettings::default(), env).unwrap();
        let client = Arc::new(DbClient::new(
            &connection,
            Arc::clone(&store) as Arc<dyn DocumentStore>,
        ));
        (store, BaseDao::new(client, "app", "users", config))
    }

    fn dao() -> BaseDao {
        dao_with(DaoConfig::default()).1
    }

    async fn only(dao: &BaseDao, filter: Value) -> Document {
        dao.find_one(document(filter), FindOptions::default())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_operation_connects() {
        let (store, dao) = dao_with(DaoConfig::default());
        assert_eq!(dao.count(None).await.unwrap(), 0);
        assert_eq!(store.handshake_count(), 1);
        dao.count(None).await.unwrap();
        assert_eq!(store.handshake_count(), 1);
    }

    #[tokio::test]
    async fn test_insert_one_stamps_same_instant() {
        let dao = dao();
        dao.insert_one(document(json!({
            "_id": "u1",
            "createdAt": "caller value",
        })))
        .await
        .unwrap();

        let stored = only(&dao, json!({"_id": "u1"})).await;
        assert_eq!(stored["createdAt"], stored["updatedAt"]);
        assert_ne!(stored["createdAt"], json!("caller value"));
        let created = stored["createdAt"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(created).is_ok());
    }

    #[tokio::test]
    async fn test_insert_without_timestamps() {
        let dao = dao_with(DaoConfig::default().without_timestamps()).1;
        dao.insert_one(document(json!({"_id": "u1"}))).await.unwrap();
        let stored = only(&dao, json!({"_id": "u1"})).await;
        assert!(!stored.contains_key("createdAt"));
        assert!(!stored.contains_key("updatedAt"));
    }

    #[tokio::test]
    async fn test_insert_many_counts_and_stamps() {
        let dao = dao();
        let inserted = dao
            .insert_many(vec![
                document(json!({"n": 1})),
                document(json!({"n": 2})),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert!(only(&dao, json!({"n": 2})).await.contains_key("createdAt"));
    }

    #[tokio::test]
    async fn test_update_one_keeps_created_at() {
        let dao = dao();
        dao.insert_one(document(json!({"_id": "u1", "name": "alice"})))
            .await
            .unwrap();
        let before = only(&dao, json!({"_id": "u1"})).await;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let modified = dao
            .update_one(
                document(json!({"_id": "u1"})),
                document(json!({"name": "alicia", "createdAt": "ignored"})),
                UpdateOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(modified, 1);

        let after = only(&dao, json!({"_id": "u1"})).await;
        assert_eq!(after["name"], json!("alicia"));
        assert_eq!(after["createdAt"], before["createdAt"]);
        assert_ne!(after["updatedAt"], before["updatedAt"]);
    }

    #[tokio::test]
    async fn test_update_one_upsert_counts_and_stamps() {
        let dao = dao();
        let count = dao
            .update_one(
                document(json!({"email": "a@example.com"})),
                document(json!({"name": "alice"})),
                UpdateOptions::upsert(),
            )
            .await
            .unwrap();
        assert_eq!(count, 1);

        let stored = only(&dao, json!({"email": "a@example.com"})).await;
        assert_eq!(stored["createdAt"], stored["updatedAt"]);
    }

    #[tokio::test]
    async fn test_update_without_match() {
        let dao = dao();
        let count = dao
            .update_one(
                document(json!({"_id": "missing"})),
                document(json!({"name": "x"})),
                UpdateOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(dao.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_many_returns_modified() {
        let dao = dao();
        dao.insert_many(vec![
            document(json!({"team": "a"})),
            document(json!({"team": "a"})),
            document(json!({"team": "b"})),
        ])
        .await
        .unwrap();
        let modified = dao
            .update_many(
                document(json!({"team": "a"})),
                document(json!({"active": true})),
                UpdateOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(modified, 2);
        assert_eq!(
            dao.count(Some(document(json!({"active": true})))).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_delete_semantics() {
        let dao = dao();
        dao.insert_many(vec![
            document(json!({"team": "a"})),
            document(json!({"team": "a"})),
            document(json!({"team": "a"})),
        ])
        .await
        .unwrap();

        assert!(dao.delete_one(document(json!({"team": "a"}))).await.unwrap());
        assert!(dao.delete_many(document(json!({"team": "a"}))).await.unwrap());
        assert!(!dao.delete_many(document(json!({"team": "a"}))).await.unwrap());
        assert!(!dao.delete_one(document(json!({"team": "a"}))).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_streams_sorted() {
        let dao = dao();
        dao.insert_many(vec![
            document(json!({"rank": 2})),
            document(json!({"rank": 1})),
            document(json!({"rank": 3})),
        ])
        .await
        .unwrap();

        let ranks: Vec<Value> = dao
            .find(
                Document::new(),
                FindOptions::default().with_sort("rank", SortOrder::Ascending),
            )
            .await
            .unwrap()
            .map_ok(|d| d["rank"].clone())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(ranks, vec![json!(1), json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn test_create_and_delete_collection() {
        let dao = dao();
        let created = dao
            .create_collection("audit", CreateCollectionOptions::default())
            .await
            .unwrap();
        assert_eq!(created.unwrap().name(), "audit");

        let again = dao
            .create_collection("audit", CreateCollectionOptions::default())
            .await
            .unwrap();
        assert!(again.is_none());

        assert!(dao.delete_collection("audit").await.unwrap());
        assert!(!dao.delete_collection("audit").await.unwrap());
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let (store, dao) = dao_with(DaoConfig::default());
        store.set_reachable(false);
        let err = dao.count(None).await.unwrap_err();
        assert!(matches!(err, DbError::Store(StoreError::Connection(_))));
    }
}
