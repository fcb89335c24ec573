//! Database and collection handles.
//!
//! Handles are cheap to construct and clone; they borrow the client's single
//! store connection.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;

use crate::error::{DbError, DbResult};
use crate::model::{
    CreateCollectionOptions, DeleteResult, Document, FindOptions, InsertManyResult,
    InsertOneResult, UpdateOptions, UpdateResult,
};
use crate::store::{ChangeStream, DocumentStore, DocumentStream, Namespace};

const INVALID_DATABASE_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$'];

fn validate_database_name(name: &str) -> DbResult<()> {
    if name.is_empty() {
        return Err(DbError::invalid_name("database name must not be empty"));
    }
    if name.contains(INVALID_DATABASE_CHARS) {
        return Err(DbError::invalid_name(format!(
            "database name '{name}' contains an invalid character"
        )));
    }
    Ok(())
}

fn validate_collection_name(name: &str) -> DbResult<()> {
    if name.is_empty() {
        return Err(DbError::invalid_name("collection name must not be empty"));
    }
    if name.contains('$') || name.starts_with("system.") {
        return Err(DbError::invalid_name(format!(
            "collection name '{name}' is reserved or contains '$'"
        )));
    }
    Ok(())
}

fn same_store(a: &Arc<dyn DocumentStore>, b: &Arc<dyn DocumentStore>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

/// Handle to one logical database.
///
/// Two handles are equal when they name the same database on the same
/// connection.
#[derive(Clone)]
pub struct Database {
    name: Arc<str>,
    store: Arc<dyn DocumentStore>,
}

impl Database {
    pub(crate) fn new(name: &str, store: Arc<dyn DocumentStore>) -> DbResult<Self> {
        validate_database_name(name)?;
        Ok(Self {
            name: Arc::from(name),
            store,
        })
    }

    /// Database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle to a collection in this database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidName`] for empty or reserved names.
    pub fn collection(&self, name: &str) -> DbResult<Collection> {
        validate_collection_name(name)?;
        Ok(Collection {
            namespace: Namespace::new(&*self.name, name),
            store: Arc::clone(&self.store),
        })
    }

    /// Names of the collections in this database.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn list_collection_names(&self) -> DbResult<Vec<String>> {
        Ok(self.store.list_collection_names(&self.name).await?)
    }

    /// Create a collection.
    ///
    /// # Errors
    ///
    /// Returns the store's `NamespaceExists` error if it already exists.
    pub async fn create_collection(
        &self,
        name: &str,
        options: &CreateCollectionOptions,
    ) -> DbResult<Collection> {
        let collection = self.collection(name)?;
        self.store
            .create_collection(&collection.namespace, options)
            .await?;
        Ok(collection)
    }

    /// Drop a collection, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn drop_collection(&self, name: &str) -> DbResult<bool> {
        let collection = self.collection(name)?;
        Ok(self.store.drop_collection(&collection.namespace).await?)
    }
}

impl PartialEq for Database {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && same_store(&self.store, &other.store)
    }
}

impl Eq for Database {}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Handle to one collection.
#[derive(Clone)]
pub struct Collection {
    namespace: Namespace,
    store: Arc<dyn DocumentStore>,
}

impl Collection {
    /// Database and collection name.
    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.namespace.coll
    }

    /// Count matching documents.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn count_documents(&self, filter: &Document) -> DbResult<u64> {
        Ok(self.store.count_documents(&self.namespace, filter).await?)
    }

    /// Stream matching documents.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn find(&self, filter: &Document, options: &FindOptions) -> DbResult<DocumentStream> {
        Ok(self.store.find(&self.namespace, filter, options).await?)
    }

    /// First matching document.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn find_one(
        &self,
        filter: &Document,
        options: &FindOptions,
    ) -> DbResult<Option<Document>> {
        let options = options.clone().with_limit(1);
        let mut documents = self.find(filter, &options).await?;
        Ok(documents.next().await.transpose()?)
    }

    /// Insert one document.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn insert_one(&self, document: Document) -> DbResult<InsertOneResult> {
        Ok(self.store.insert_one(&self.namespace, document).await?)
    }

    /// Insert documents in order.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn insert_many(&self, documents: Vec<Document>) -> DbResult<InsertManyResult> {
        Ok(self.store.insert_many(&self.namespace, documents).await?)
    }

    /// Apply an update document to the first match.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn update_one(
        &self,
        filter: &Document,
        update: &Document,
        options: &UpdateOptions,
    ) -> DbResult<UpdateResult> {
        Ok(self
            .store
            .update_one(&self.namespace, filter, update, options)
            .await?)
    }

    /// Apply an update document to every match.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn update_many(
        &self,
        filter: &Document,
        update: &Document,
        options: &UpdateOptions,
    ) -> DbResult<UpdateResult> {
        Ok(self
            .store
            .update_many(&self.namespace, filter, update, options)
            .await?)
    }

    /// Delete the first match.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn delete_one(&self, filter: &Document) -> DbResult<DeleteResult> {
        Ok(self.store.delete_one(&self.namespace, filter).await?)
    }

    /// Delete every match.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn delete_many(&self, filter: &Document) -> DbResult<DeleteResult> {
        Ok(self.store.delete_many(&self.namespace, filter).await?)
    }

    /// Subscribe to changes in this collection.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn watch(&self) -> DbResult<ChangeStream> {
        Ok(self.store.watch(&self.namespace).await?)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn store() -> Arc<dyn DocumentStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_database_equality() {
        let shared = store();
        let a = Database::new("app", Arc::clone(&shared)).unwrap();
        let b = Database::new("app", Arc::clone(&shared)).unwrap();
        let other_name = Database::new("billing", Arc::clone(&shared)).unwrap();
        let other_store = Database::new("app", store()).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, other_name);
        assert_ne!(a, other_store);
        assert_eq!(other_name.name(), "billing");
    }

    #[test]
    fn test_invalid_database_names() {
        for name in ["", "a.b", "a b", "a$b", "a/b"] {
            assert!(matches!(
                Database::new(name, store()),
                Err(DbError::InvalidName(_))
            ));
        }
    }

    #[test]
    fn test_collection_names() {
        let db = Database::new("app", store()).unwrap();
        let users = db.collection("users").unwrap();
        assert_eq!(users.name(), "users");
        assert_eq!(users.namespace(), &Namespace::new("app", "users"));

        assert!(db.collection("").is_err());
        assert!(db.collection("system.indexes").is_err());
        assert!(db.collection("a$b").is_err());
    }

    #[tokio::test]
    async fn test_find_one_on_empty_collection() {
        let store = store();
        store.connect().await.unwrap();
        let db = Database::new("app", store).unwrap();
        let users = db.collection("users").unwrap();
        let found = users
            .find_one(&Document::new(), &FindOptions::default())
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
