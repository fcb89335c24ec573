//! In-process [`DocumentStore`].
//!
//! Supports equality filters on (dotted) paths, `$set`, `$setOnInsert` and
//! `$unset` updates with upsert, skip/limit/sort, capped collections and a
//! broadcast change feed. Change streams end when the store is closed.
//! Useful for tests and local development.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering as AtomicOrdering};
use std::sync::{PoisonError, RwLock as SyncRwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::{Map, Value, json};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::model::{
    CreateCollectionOptions, DeleteResult, Document, FindOptions, ID_FIELD, InsertManyResult,
    InsertOneResult, SortOrder, UpdateOptions, UpdateResult,
};
use crate::store::{
    ChangeEvent, ChangeStream, DocumentStore, DocumentStream, Namespace, OperationType,
};

const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct MemoryCollection {
    documents: Vec<Document>,
    options: CreateCollectionOptions,
}

impl MemoryCollection {
    fn push(&mut self, document: Document) {
        self.documents.push(document);
        if let (true, Some(max)) = (self.options.capped, self.options.max_documents) {
            let max = usize::try_from(max).unwrap_or(usize::MAX);
            let overflow = self.documents.len().saturating_sub(max);
            self.documents.drain(..overflow);
        }
    }

    fn contains_id(&self, id: &Value) -> bool {
        self.documents.iter().any(|d| d.get(ID_FIELD) == Some(id))
    }
}

type Databases = BTreeMap<String, BTreeMap<String, MemoryCollection>>;

/// Document store held entirely in memory.
#[derive(Debug)]
pub struct MemoryStore {
    databases: RwLock<Databases>,
    connected: AtomicBool,
    reachable: AtomicBool,
    handshakes: AtomicU32,
    handshake_delay: Duration,
    changes: SyncRwLock<broadcast::Sender<ChangeEvent>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty, unconnected store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            databases: RwLock::new(BTreeMap::new()),
            connected: AtomicBool::new(false),
            reachable: AtomicBool::new(true),
            handshakes: AtomicU32::new(0),
            handshake_delay: Duration::ZERO,
            changes: SyncRwLock::new(changes),
        }
    }

    /// Make every handshake take at least `delay`.
    #[must_use]
    pub fn with_handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = delay;
        self
    }

    /// Number of handshakes attempted so far.
    #[must_use]
    pub fn handshake_count(&self) -> u32 {
        self.handshakes.load(AtomicOrdering::SeqCst)
    }

    /// Make subsequent handshakes succeed or fail.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, AtomicOrdering::SeqCst);
    }

    fn ensure_connected(&self) -> StoreResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(StoreError::NotConnected)
        }
    }

    fn publish(
        &self,
        operation_type: OperationType,
        ns: &Namespace,
        document_key: Option<Value>,
        full_document: Option<Document>,
    ) {
        let changes = self.changes.read().unwrap_or_else(PoisonError::into_inner);
        // No receivers is not an error for the writer.
        let _ = changes.send(ChangeEvent {
            operation_type,
            ns: ns.clone(),
            document_key,
            full_document,
            cluster_time: Utc::now(),
        });
    }

    fn insert_into(
        &self,
        collection: &mut MemoryCollection,
        ns: &Namespace,
        mut document: Document,
    ) -> StoreResult<Value> {
        let id = document
            .entry(ID_FIELD)
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()))
            .clone();
        if collection.contains_id(&id) {
            return Err(StoreError::DuplicateKey(format!("{ns} _id: {id}")));
        }
        self.publish(
            OperationType::Insert,
            ns,
            Some(id_key(&id)),
            Some(document.clone()),
        );
        collection.push(document);
        Ok(id)
    }

    async fn update(
        &self,
        ns: &Namespace,
        filter: &Document,
        update: &Document,
        options: &UpdateOptions,
        multi: bool,
    ) -> StoreResult<UpdateResult> {
        self.ensure_connected()?;
        let mut databases = self.databases.write().await;
        let mut result = UpdateResult::default();

        if let Some(collection) = databases.get_mut(&ns.db).and_then(|db| db.get_mut(&ns.coll)) {
            for document in collection.documents.iter_mut().filter(|d| matches(d, filter)) {
                result.matched_count += 1;
                let mut updated = document.clone();
                apply_update(&mut updated, update, false)?;
                if updated != *document {
                    *document = updated;
                    result.modified_count += 1;
                    self.publish(
                        OperationType::Update,
                        ns,
                        document.get(ID_FIELD).map(id_key),
                        Some(document.clone()),
                    );
                }
                if !multi {
                    break;
                }
            }
        }

        if result.matched_count == 0 && options.upsert {
            let mut document = upsert_seed(filter)?;
            apply_update(&mut document, update, true)?;
            let collection = databases
                .entry(ns.db.clone())
                .or_default()
                .entry(ns.coll.clone())
                .or_default();
            result.upserted_id = Some(self.insert_into(collection, ns, document)?);
        }

        Ok(result)
    }

    async fn delete(
        &self,
        ns: &Namespace,
        filter: &Document,
        multi: bool,
    ) -> StoreResult<DeleteResult> {
        self.ensure_connected()?;
        let mut databases = self.databases.write().await;
        let Some(collection) = databases.get_mut(&ns.db).and_then(|db| db.get_mut(&ns.coll)) else {
            return Ok(DeleteResult::default());
        };

        let removed: Vec<Document> = if multi {
            let (removed, kept): (Vec<Document>, Vec<Document>) =
                std::mem::take(&mut collection.documents)
                    .into_iter()
                    .partition(|d| matches(d, filter));
            collection.documents = kept;
            removed
        } else {
            collection
                .documents
                .iter()
                .position(|d| matches(d, filter))
                .map(|index| collection.documents.remove(index))
                .into_iter()
                .collect()
        };

        for document in &removed {
            self.publish(
                OperationType::Delete,
                ns,
                document.get(ID_FIELD).map(id_key),
                None,
            );
        }
        Ok(DeleteResult {
            deleted_count: to_u64(removed.len()),
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn connect(&self) -> StoreResult<()> {
        self.handshakes.fetch_add(1, AtomicOrdering::SeqCst);
        if !self.handshake_delay.is_zero() {
            tokio::time::sleep(self.handshake_delay).await;
        }
        if !self.reachable.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::connection("server selection timed out"));
        }
        self.connected.store(true, AtomicOrdering::SeqCst);
        debug!("Memory store connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(AtomicOrdering::SeqCst)
    }

    async fn close(&self) -> StoreResult<()> {
        self.connected.store(false, AtomicOrdering::SeqCst);
        // Dropping the old sender ends every open change stream.
        let (fresh, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        *self.changes.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        debug!("Memory store closed");
        Ok(())
    }

    async fn list_collection_names(&self, db: &str) -> StoreResult<Vec<String>> {
        self.ensure_connected()?;
        let databases = self.databases.read().await;
        Ok(databases
            .get(db)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_collection(
        &self,
        ns: &Namespace,
        options: &CreateCollectionOptions,
    ) -> StoreResult<()> {
        self.ensure_connected()?;
        let mut databases = self.databases.write().await;
        let collections = databases.entry(ns.db.clone()).or_default();
        if collections.contains_key(&ns.coll) {
            return Err(StoreError::NamespaceExists(ns.to_string()));
        }
        collections.insert(
            ns.coll.clone(),
            MemoryCollection {
                documents: Vec::new(),
                options: *options,
            },
        );
        Ok(())
    }

    async fn drop_collection(&self, ns: &Namespace) -> StoreResult<bool> {
        self.ensure_connected()?;
        let mut databases = self.databases.write().await;
        let existed = databases
            .get_mut(&ns.db)
            .and_then(|collections| collections.remove(&ns.coll))
            .is_some();
        if existed {
            self.publish(OperationType::Drop, ns, None, None);
        }
        Ok(existed)
    }

    async fn count_documents(&self, ns: &Namespace, filter: &Document) -> StoreResult<u64> {
        self.ensure_connected()?;
        let databases = self.databases.read().await;
        Ok(lookup_collection(&databases, ns).map_or(0, |collection| {
            to_u64(
                collection
                    .documents
                    .iter()
                    .filter(|d| matches(d, filter))
                    .count(),
            )
        }))
    }

    async fn find(
        &self,
        ns: &Namespace,
        filter: &Document,
        options: &FindOptions,
    ) -> StoreResult<DocumentStream> {
        self.ensure_connected()?;
        let mut documents: Vec<Document> = {
            let databases = self.databases.read().await;
            lookup_collection(&databases, ns)
                .map(|collection| {
                    collection
                        .documents
                        .iter()
                        .filter(|d| matches(d, filter))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };

        if let Some((field, order)) = &options.sort {
            documents.sort_by(|a, b| {
                let ordering = compare(lookup(a, field), lookup(b, field));
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }

        let skip = options.skip.map_or(0, to_usize);
        let limit = options
            .limit
            .filter(|limit| *limit > 0)
            .map_or(usize::MAX, to_usize);

        Ok(stream::iter(documents.into_iter().skip(skip).take(limit).map(Ok)).boxed())
    }

    async fn insert_one(&self, ns: &Namespace, document: Document) -> StoreResult<InsertOneResult> {
        self.ensure_connected()?;
        let mut databases = self.databases.write().await;
        let collection = databases
            .entry(ns.db.clone())
            .or_default()
            .entry(ns.coll.clone())
            .or_default();
        let inserted_id = self.insert_into(collection, ns, document)?;
        Ok(InsertOneResult { inserted_id })
    }

    async fn insert_many(
        &self,
        ns: &Namespace,
        documents: Vec<Document>,
    ) -> StoreResult<InsertManyResult> {
        self.ensure_connected()?;
        let mut databases = self.databases.write().await;
        let collection = databases
            .entry(ns.db.clone())
            .or_default()
            .entry(ns.coll.clone())
            .or_default();
        let mut result = InsertManyResult::default();
        for document in documents {
            result
                .inserted_ids
                .push(self.insert_into(collection, ns, document)?);
        }
        Ok(result)
    }

    async fn update_one(
        &self,
        ns: &Namespace,
        filter: &Document,
        update: &Document,
        options: &UpdateOptions,
    ) -> StoreResult<UpdateResult> {
        self.update(ns, filter, update, options, false).await
    }

    async fn update_many(
        &self,
        ns: &Namespace,
        filter: &Document,
        update: &Document,
        options: &UpdateOptions,
    ) -> StoreResult<UpdateResult> {
        self.update(ns, filter, update, options, true).await
    }

    async fn delete_one(&self, ns: &Namespace, filter: &Document) -> StoreResult<DeleteResult> {
        self.delete(ns, filter, false).await
    }

    async fn delete_many(&self, ns: &Namespace, filter: &Document) -> StoreResult<DeleteResult> {
        self.delete(ns, filter, true).await
    }

    async fn watch(&self, ns: &Namespace) -> StoreResult<ChangeStream> {
        self.ensure_connected()?;
        let receiver = self
            .changes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe();
        let ns = ns.clone();
        let stream = stream::unfold(receiver, move |mut receiver| {
            let ns = ns.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(event) if event.ns == ns => return Some((event, receiver)),
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(namespace = %ns, skipped, "Change stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });
        Ok(stream.boxed())
    }
}

fn lookup_collection<'a>(databases: &'a Databases, ns: &Namespace) -> Option<&'a MemoryCollection> {
    databases.get(&ns.db).and_then(|collections| collections.get(&ns.coll))
}

fn id_key(id: &Value) -> Value {
    json!({ ID_FIELD: id })
}

fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

/// Resolve a dotted path inside a document.
fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Equality match on every filter entry; `null` also matches a missing field.
fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(path, expected)| {
        lookup(document, path).map_or(expected.is_null(), |actual| actual == expected)
    })
}

fn set_path(document: &mut Document, path: &str, value: Value) -> StoreResult<()> {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };
    let mut current = document;
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        current = current
            .entry(segment)
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| {
                StoreError::invalid_update(format!(
                    "cannot create field '{path}' inside a non-document"
                ))
            })?;
    }
    current.insert(leaf.to_string(), value);
    Ok(())
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = document.get_mut(head) {
                unset_path(child, rest);
            }
        }
    }
}

fn guard_id(path: &str) -> StoreResult<()> {
    if path == ID_FIELD {
        Err(StoreError::invalid_update("the _id field is immutable"))
    } else {
        Ok(())
    }
}

fn apply_update(document: &mut Document, update: &Document, inserting: bool) -> StoreResult<()> {
    if update.is_empty() {
        return Err(StoreError::invalid_update("update document is empty"));
    }
    for (operator, fields) in update {
        let Value::Object(fields) = fields else {
            return Err(StoreError::invalid_update(format!(
                "{operator} expects a document"
            )));
        };
        match operator.as_str() {
            "$set" => {
                for (path, value) in fields {
                    guard_id(path)?;
                    set_path(document, path, value.clone())?;
                }
            }
            "$setOnInsert" => {
                if inserting {
                    for (path, value) in fields {
                        set_path(document, path, value.clone())?;
                    }
                }
            }
            "$unset" => {
                for path in fields.keys() {
                    guard_id(path)?;
                    unset_path(document, path);
                }
            }
            other => {
                return Err(StoreError::invalid_update(format!(
                    "unsupported update operator '{other}'"
                )));
            }
        }
    }
    Ok(())
}

/// Document an upsert starts from: the filter's equality fields.
fn upsert_seed(filter: &Document) -> StoreResult<Document> {
    let mut document = Document::new();
    for (path, value) in filter.iter().filter(|(path, _)| !path.starts_with('$')) {
        set_path(&mut document, path, value.clone())?;
    }
    Ok(document)
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), Some(other)) if !other.is_null() => Ordering::Less,
        (Some(other), None | Some(Value::Null)) if !other.is_null() => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
