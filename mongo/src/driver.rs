//! [`DocumentStore`] backed by the official MongoDB driver.
//!
//! Documents cross the boundary as relaxed extended JSON, so `{"$oid": ...}`
//! and `{"$date": ...}` values in filters and documents reach the server as
//! their BSON types.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future;
use futures::stream::StreamExt;
use mongodb::bson::{Bson, Document as BsonDocument, doc};
use mongodb::change_stream::event::{ChangeStreamEvent, OperationType as DriverOperation};
use mongodb::error::{Error as DriverError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, FullDocumentType};
use mongodb::{Client, Collection as DriverCollection};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::{ConnectionConfig, DriverOptions};
use crate::error::{DbResult, StoreError, StoreResult};
use crate::model::{
    CreateCollectionOptions, DeleteResult, Document, FindOptions, InsertManyResult,
    InsertOneResult, SortOrder, UpdateOptions, UpdateResult,
};
use crate::store::{
    ChangeEvent, ChangeStream, DocumentStore, DocumentStream, Namespace, OperationType,
};

const DUPLICATE_KEY: i32 = 11000;
const NAMESPACE_EXISTS: i32 = 48;

/// Capped collections need a byte bound; this many bytes are reserved per
/// document, with a 1 MiB floor.
const CAPPED_BYTES_PER_DOCUMENT: u64 = 1024;
const CAPPED_MIN_BYTES: u64 = 1024 * 1024;

/// Store talking to a MongoDB deployment.
pub struct MongoStore {
    uri: SecretString,
    options: DriverOptions,
    client: RwLock<Option<Client>>,
}

impl MongoStore {
    /// Store for `config`. Nothing is contacted until [`DocumentStore::connect`].
    #[must_use]
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            uri: SecretString::from(config.connection_uri().to_string()),
            options: config.options().clone(),
            client: RwLock::new(None),
        }
    }

    /// Connector for [`crate::DbClientProvider::new`].
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches [`crate::StoreConnector`].
    pub fn connector(config: &ConnectionConfig) -> DbResult<Arc<dyn DocumentStore>> {
        Ok(Arc::new(Self::new(config)))
    }

    fn client(&self) -> StoreResult<Client> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StoreError::NotConnected)
    }

    fn collection(&self, ns: &Namespace) -> StoreResult<DriverCollection<BsonDocument>> {
        Ok(self.client()?.database(&ns.db).collection(&ns.coll))
    }
}

impl fmt::Debug for MongoStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoStore")
            .field("options", &self.options)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Copy pool and timeout settings onto parsed driver options.
pub fn apply_driver_options(target: &mut ClientOptions, options: &DriverOptions) {
    target.max_pool_size = Some(options.max_pool_size);
    if let Some(size) = options.min_pool_size {
        target.min_pool_size = Some(size);
    }
    if let Some(timeout) = options.connect_timeout {
        target.connect_timeout = Some(timeout);
    }
    if let Some(timeout) = options.server_selection_timeout {
        target.server_selection_timeout = Some(timeout);
    }
    if let Some(name) = &options.app_name {
        target.app_name = Some(name.clone());
    }
}

fn to_bson(document: &Document) -> StoreResult<BsonDocument> {
    BsonDocument::try_from(document.clone())
        .map_err(|e| StoreError::InvalidDocument(e.to_string()))
}

fn to_json(document: BsonDocument) -> Document {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn server_code(error: &DriverError) -> Option<i32> {
    match error.kind.as_ref() {
        ErrorKind::Command(e) => Some(e.code),
        ErrorKind::Write(WriteFailure::WriteError(e)) => Some(e.code),
        ErrorKind::InsertMany(e) => e.write_errors.as_ref()?.first().map(|e| e.code),
        _ => None,
    }
}

fn classify(code: Option<i32>, selection_failed: bool, message: String) -> StoreError {
    match code {
        Some(DUPLICATE_KEY) => StoreError::DuplicateKey(message),
        Some(NAMESPACE_EXISTS) => StoreError::NamespaceExists(message),
        _ if selection_failed => StoreError::Connection(message),
        _ => StoreError::Driver(message),
    }
}

fn store_error(error: DriverError) -> StoreError {
    let selection_failed = matches!(error.kind.as_ref(), ErrorKind::ServerSelection { .. });
    classify(server_code(&error), selection_failed, error.to_string())
}

const fn sort_direction(order: SortOrder) -> i32 {
    match order {
        SortOrder::Ascending => 1,
        SortOrder::Descending => -1,
    }
}

fn capped_size(max_documents: Option<u64>) -> u64 {
    max_documents
        .map_or(CAPPED_MIN_BYTES, |max| max.saturating_mul(CAPPED_BYTES_PER_DOCUMENT))
        .max(CAPPED_MIN_BYTES)
}

fn update_result(result: mongodb::results::UpdateResult) -> UpdateResult {
    UpdateResult {
        matched_count: result.matched_count,
        modified_count: result.modified_count,
        upserted_id: result.upserted_id.map(Bson::into_relaxed_extjson),
    }
}

fn change_event(
    event: ChangeStreamEvent<BsonDocument>,
    watched: &Namespace,
) -> Option<ChangeEvent> {
    let operation_type = match event.operation_type {
        DriverOperation::Insert => OperationType::Insert,
        DriverOperation::Update => OperationType::Update,
        DriverOperation::Replace => OperationType::Replace,
        DriverOperation::Delete => OperationType::Delete,
        DriverOperation::Drop => OperationType::Drop,
        _ => return None,
    };
    let ns = event.ns.map_or_else(
        || watched.clone(),
        |ns| Namespace::new(ns.db, ns.coll.unwrap_or_else(|| watched.coll.clone())),
    );
    let cluster_time = event
        .cluster_time
        .and_then(|ts| DateTime::from_timestamp(i64::from(ts.time), 0))
        .unwrap_or_else(Utc::now);

    Some(ChangeEvent {
        operation_type,
        ns,
        document_key: event.document_key.map(|key| Value::Object(to_json(key))),
        full_document: event.full_document.map(to_json),
        cluster_time,
    })
}

#[async_trait]
impl DocumentStore for MongoStore {
    #[instrument(skip(self))]
    async fn connect(&self) -> StoreResult<()> {
        let mut options = ClientOptions::parse(self.uri.expose_secret())
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;
        apply_driver_options(&mut options, &self.options);

        let client =
            Client::with_options(options).map_err(|e| StoreError::connection(e.to_string()))?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;

        *self.client.write().unwrap_or_else(PoisonError::into_inner) = Some(client);
        debug!("MongoDB deployment reachable");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    async fn close(&self) -> StoreResult<()> {
        let client = self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(client) = client {
            client.shutdown().await;
            debug!("MongoDB client shut down");
        }
        Ok(())
    }

    async fn list_collection_names(&self, db: &str) -> StoreResult<Vec<String>> {
        let mut names = self
            .client()?
            .database(db)
            .list_collection_names()
            .await
            .map_err(store_error)?;
        names.sort();
        Ok(names)
    }

    async fn create_collection(
        &self,
        ns: &Namespace,
        options: &CreateCollectionOptions,
    ) -> StoreResult<()> {
        let database = self.client()?.database(&ns.db);
        let mut action = database.create_collection(&ns.coll);
        if options.capped {
            action = action.capped(true).size(capped_size(options.max_documents));
            if let Some(max) = options.max_documents {
                action = action.max(max);
            }
        }
        action.await.map_err(|e| match store_error(e) {
            StoreError::NamespaceExists(_) => StoreError::NamespaceExists(ns.to_string()),
            other => other,
        })
    }

    async fn drop_collection(&self, ns: &Namespace) -> StoreResult<bool> {
        if !self.list_collection_names(&ns.db).await?.contains(&ns.coll) {
            return Ok(false);
        }
        self.collection(ns)?.drop().await.map_err(store_error)?;
        Ok(true)
    }

    async fn count_documents(&self, ns: &Namespace, filter: &Document) -> StoreResult<u64> {
        self.collection(ns)?
            .count_documents(to_bson(filter)?)
            .await
            .map_err(store_error)
    }

    async fn find(
        &self,
        ns: &Namespace,
        filter: &Document,
        options: &FindOptions,
    ) -> StoreResult<DocumentStream> {
        let collection = self.collection(ns)?;
        let mut action = collection.find(to_bson(filter)?);
        if let Some(skip) = options.skip {
            action = action.skip(skip);
        }
        if let Some(limit) = options.limit {
            action = action.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some((field, order)) = &options.sort {
            let mut sort = BsonDocument::new();
            sort.insert(field.clone(), sort_direction(*order));
            action = action.sort(sort);
        }

        let cursor = action.await.map_err(store_error)?;
        Ok(cursor
            .map(|item| item.map(to_json).map_err(store_error))
            .boxed())
    }

    async fn insert_one(&self, ns: &Namespace, document: Document) -> StoreResult<InsertOneResult> {
        let result = self
            .collection(ns)?
            .insert_one(to_bson(&document)?)
            .await
            .map_err(store_error)?;
        Ok(InsertOneResult {
            inserted_id: result.inserted_id.into_relaxed_extjson(),
        })
    }

    async fn insert_many(
        &self,
        ns: &Namespace,
        documents: Vec<Document>,
    ) -> StoreResult<InsertManyResult> {
        if documents.is_empty() {
            return Ok(InsertManyResult {
                inserted_ids: Vec::new(),
            });
        }
        let documents = documents
            .iter()
            .map(to_bson)
            .collect::<StoreResult<Vec<_>>>()?;

        let result = self
            .collection(ns)?
            .insert_many(documents)
            .await
            .map_err(store_error)?;
        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(InsertManyResult {
            inserted_ids: ids
                .into_iter()
                .map(|(_, id)| id.into_relaxed_extjson())
                .collect(),
        })
    }

    async fn update_one(
        &self,
        ns: &Namespace,
        filter: &Document,
        update: &Document,
        options: &UpdateOptions,
    ) -> StoreResult<UpdateResult> {
        self.collection(ns)?
            .update_one(to_bson(filter)?, to_bson(update)?)
            .upsert(options.upsert)
            .await
            .map(update_result)
            .map_err(store_error)
    }

    async fn update_many(
        &self,
        ns: &Namespace,
        filter: &Document,
        update: &Document,
        options: &UpdateOptions,
    ) -> StoreResult<UpdateResult> {
        self.collection(ns)?
            .update_many(to_bson(filter)?, to_bson(update)?)
            .upsert(options.upsert)
            .await
            .map(update_result)
            .map_err(store_error)
    }

    async fn delete_one(&self, ns: &Namespace, filter: &Document) -> StoreResult<DeleteResult> {
        let result = self
            .collection(ns)?
            .delete_one(to_bson(filter)?)
            .await
            .map_err(store_error)?;
        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }

    async fn delete_many(&self, ns: &Namespace, filter: &Document) -> StoreResult<DeleteResult> {
        let result = self
            .collection(ns)?
            .delete_many(to_bson(filter)?)
            .await
            .map_err(store_error)?;
        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }

    async fn watch(&self, ns: &Namespace) -> StoreResult<ChangeStream> {
        let changes = self
            .collection(ns)?
            .watch()
            .full_document(FullDocumentType::UpdateLookup)
            .await
            .map_err(store_error)?;

        let watched = ns.clone();
        let logged = ns.clone();
        Ok(changes
            .take_while(move |item| {
                if let Err(e) = item {
                    warn!(namespace = %logged, error = %e, "Change stream failed");
                }
                future::ready(item.is_ok())
            })
            .filter_map(move |item| {
                future::ready(item.ok().and_then(|event| change_event(event, &watched)))
            })
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionSettings;
    use mongodb::bson::oid::ObjectId;
    use mongodb::bson::{Timestamp, from_slice, to_vec};
    use serde_json::json;
    use std::time::Duration;
    use test_utils::fixtures::{document, env_lookup, sample_db_env};

    fn config() -> ConnectionConfig {
        let env = env_lookup(sample_db_env());
        ConnectionConfig::resolve_with(ConnectionSettings::default(), env).unwrap()
    }

    // Change events reach the driver as raw BSON.
    fn decode_event(raw: BsonDocument) -> ChangeStreamEvent<BsonDocument> {
        from_slice(&to_vec(&raw).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_driver_options_are_applied() {
        let mut parsed = ClientOptions::parse("mongodb://localhost:27017").await.unwrap();
        let options = DriverOptions::default()
            .with_max_pool_size(12)
            .with_min_pool_size(2)
            .with_connect_timeout(Duration::from_secs(3))
            .with_server_selection_timeout(Duration::from_secs(4))
            .with_app_name("billing");

        apply_driver_options(&mut parsed, &options);

        assert_eq!(parsed.max_pool_size, Some(12));
        assert_eq!(parsed.min_pool_size, Some(2));
        assert_eq!(parsed.connect_timeout, Some(Duration::from_secs(3)));
        assert_eq!(parsed.server_selection_timeout, Some(Duration::from_secs(4)));
        assert_eq!(parsed.app_name.as_deref(), Some("billing"));
    }

    #[tokio::test]
    async fn test_unset_options_keep_uri_values() {
        let mut parsed = ClientOptions::parse("mongodb://localhost:27017/?appName=from-uri")
            .await
            .unwrap();
        apply_driver_options(&mut parsed, &DriverOptions::default());

        assert_eq!(parsed.max_pool_size, Some(5));
        assert_eq!(parsed.app_name.as_deref(), Some("from-uri"));
    }

    #[tokio::test]
    async fn test_operations_require_connect() {
        let store = MongoStore::new(&config());
        assert!(!store.is_connected());
        assert_eq!(
            store.list_collection_names("app").await.unwrap_err(),
            StoreError::NotConnected
        );
        let ns = Namespace::new("app", "users");
        assert!(matches!(
            store.count_documents(&ns, &Document::new()).await,
            Err(StoreError::NotConnected)
        ));
        assert!(store.watch(&ns).await.is_err());
        store.close().await.unwrap();
    }

    #[test]
    fn test_debug_hides_uri() {
        let debug = format!("{:?}", MongoStore::new(&config()));
        assert!(!debug.contains("s3cr3t"));
        assert!(!debug.contains("cluster0.example.net"));
    }

    #[test]
    fn test_connector_builds_unconnected_store() {
        let store = MongoStore::connector(&config()).unwrap();
        assert!(!store.is_connected());
    }

    #[test]
    fn test_extended_json_crosses_the_boundary() {
        let id = ObjectId::new();
        let converted = to_bson(&document(json!({
            "_id": { "$oid": id.to_hex() },
            "name": "alice",
            "roles": ["admin"],
        })))
        .unwrap();
        assert_eq!(converted.get_object_id("_id").unwrap(), id);
        assert_eq!(converted.get_str("name").unwrap(), "alice");

        let back = to_json(converted);
        assert_eq!(back["_id"], json!({ "$oid": id.to_hex() }));
        assert_eq!(back["roles"], json!(["admin"]));
    }

    #[test]
    fn test_server_codes_map_to_store_errors() {
        assert!(matches!(
            classify(Some(DUPLICATE_KEY), false, "E11000".to_string()),
            StoreError::DuplicateKey(_)
        ));
        assert!(matches!(
            classify(Some(NAMESPACE_EXISTS), false, "exists".to_string()),
            StoreError::NamespaceExists(_)
        ));
        assert!(matches!(
            classify(None, true, "no server".to_string()),
            StoreError::Connection(_)
        ));
        assert!(matches!(
            classify(Some(2), false, "bad value".to_string()),
            StoreError::Driver(_)
        ));
    }

    #[test]
    fn test_capped_size_has_floor() {
        assert_eq!(capped_size(None), CAPPED_MIN_BYTES);
        assert_eq!(capped_size(Some(10)), CAPPED_MIN_BYTES);
        assert_eq!(capped_size(Some(4096)), 4096 * CAPPED_BYTES_PER_DOCUMENT);
    }

    #[test]
    fn test_change_event_conversion() {
        let event = decode_event(doc! {
            "_id": { "_data": "token" },
            "operationType": "insert",
            "ns": { "db": "app", "coll": "users" },
            "documentKey": { "_id": "u1" },
            "fullDocument": { "_id": "u1", "name": "alice" },
            "clusterTime": Timestamp { time: 1_700_000_000, increment: 1 },
        });

        let converted = change_event(event, &Namespace::new("app", "users")).unwrap();
        assert_eq!(converted.operation_type, OperationType::Insert);
        assert_eq!(converted.ns, Namespace::new("app", "users"));
        assert_eq!(converted.document_key, Some(json!({ "_id": "u1" })));
        assert_eq!(converted.full_document.unwrap()["name"], json!("alice"));
        assert_eq!(converted.cluster_time.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_unsupported_change_events_are_skipped() {
        let event = decode_event(doc! {
            "_id": { "_data": "token" },
            "operationType": "invalidate",
        });
        assert!(change_event(event, &Namespace::new("app", "users")).is_none());
    }
}
