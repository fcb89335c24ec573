//! Wiring shared by the end-to-end tests: one in-memory store behind one
//! provider, configured the way a service would be at startup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use sdk_crypto::HashOptions;
use sdk_mongo::{
    BaseDao, ConnectionConfig, ConnectionSettings, DaoConfig, DbClient, DbClientProvider,
    DbResult, DocumentStore, MemoryStore, UserRepository,
};
use test_utils::fixtures::env_lookup;

/// A composition root over an in-memory store.
#[derive(Debug)]
pub struct SdkHarness {
    store: Arc<MemoryStore>,
    provider: DbClientProvider,
    config: ConnectionConfig,
}

impl SdkHarness {
    /// Resolve configuration from `env` and build the provider.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `env` lacks connection settings.
    pub fn from_env(env: HashMap<String, String>) -> DbResult<Self> {
        let config =
            ConnectionConfig::resolve_with(ConnectionSettings::default(), env_lookup(env))?;
        let store = Arc::new(MemoryStore::new());
        let provider = DbClientProvider::with_store(Arc::clone(&store) as Arc<dyn DocumentStore>);
        Ok(Self {
            store,
            provider,
            config,
        })
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// The resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The shared client.
    ///
    /// # Errors
    ///
    /// Propagates client construction errors.
    pub fn client(&self) -> DbResult<Arc<DbClient>> {
        self.provider.create(&self.config)
    }

    /// An accessor for `db.collection` with timestamps enabled.
    ///
    /// # Errors
    ///
    /// Propagates client construction errors.
    pub fn dao(&self, db: &str, collection: &str) -> DbResult<Arc<BaseDao>> {
        Ok(Arc::new(BaseDao::new(
            self.client()?,
            db,
            collection,
            DaoConfig::default(),
        )))
    }

    /// A user repository over `db.collection`.
    ///
    /// # Errors
    ///
    /// Propagates client construction errors.
    pub fn user_repository(
        &self,
        db: &str,
        collection: &str,
        hash_options: HashOptions,
    ) -> DbResult<UserRepository> {
        Ok(UserRepository::new(self.dao(db, collection)?).with_hash_options(hash_options))
    }
}
