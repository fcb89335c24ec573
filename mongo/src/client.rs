//! Connection manager.
//!
//! The composition root owns one [`DbClientProvider`]; every accessor gets its
//! [`DbClient`] from it. The client performs at most one connection handshake
//! at a time, reuses the established connection and handshakes again if the
//! store reports the connection lost.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sdk_logger::ClientLogger;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::config::{ConnectionConfig, DriverOptions};
use crate::database::Database;
use crate::driver::MongoStore;
use crate::error::{DbError, DbResult};
use crate::store::DocumentStore;

/// Builds a store from a resolved configuration.
pub type StoreConnector =
    dyn Fn(&ConnectionConfig) -> DbResult<Arc<dyn DocumentStore>> + Send + Sync;

/// Client owning the single store connection.
pub struct DbClient {
    store: Arc<dyn DocumentStore>,
    handshake: Mutex<()>,
    closed: AtomicBool,
    host: String,
    options: DriverOptions,
    logger: ClientLogger,
}

impl DbClient {
    /// Wrap a store built for `config`. No I/O happens until [`Self::connect`].
    #[must_use]
    pub fn new(config: &ConnectionConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            handshake: Mutex::new(()),
            closed: AtomicBool::new(false),
            host: config.host().to_string(),
            options: config.options().clone(),
            logger: ClientLogger::new("DbClient"),
        }
    }

    /// Driver options the client was built with.
    #[must_use]
    pub const fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Handle to the named database, connecting first if needed.
    ///
    /// Concurrent callers share one in-flight handshake. A failed handshake,
    /// or a connection the store later reports lost, leaves the client
    /// unconnected so the next call handshakes again.
    ///
    /// # Errors
    ///
    /// - [`DbError::InvalidName`] for an empty or malformed name
    /// - [`DbError::ClientClosed`] after [`Self::disconnect`]
    /// - [`DbError::Store`] if the handshake fails
    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn connect(&self, name: &str) -> DbResult<Database> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DbError::ClientClosed);
        }
        let database = Database::new(name, Arc::clone(&self.store))?;

        if !self.store.is_connected() {
            self.handshake().await?;
        }

        Ok(database)
    }

    async fn handshake(&self) -> DbResult<()> {
        let _guard = self.handshake.lock().await;
        // Waiters find the connection established by the holder.
        if self.store.is_connected() {
            return Ok(());
        }

        self.logger.verbose(format!("Connecting to {}", self.host));
        self.store.connect().await.inspect_err(|e| {
            self.logger.error(format!("Connection to {} failed: {e}", self.host));
        })?;
        self.logger.info(format!("Connected to {}", self.host));
        Ok(())
    }

    /// Close the connection. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Propagates the store's close error.
    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn disconnect(&self) -> DbResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.store.close().await?;
        self.logger.info(format!("Disconnected from {}", self.host));
        Ok(())
    }

    /// Whether the store reports a live connection.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.store.is_connected()
    }
}

impl fmt::Debug for DbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbClient")
            .field("host", &self.host)
            .field("options", &self.options)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Holder of the one [`DbClient`] per composition root.
pub struct DbClientProvider {
    client: once_cell::sync::OnceCell<Arc<DbClient>>,
    connector: Box<StoreConnector>,
}

impl DbClientProvider {
    /// Create a provider that builds its store with `connector`.
    pub fn new<F>(connector: F) -> Self
    where
        F: Fn(&ConnectionConfig) -> DbResult<Arc<dyn DocumentStore>> + Send + Sync + 'static,
    {
        Self {
            client: once_cell::sync::OnceCell::new(),
            connector: Box::new(connector),
        }
    }

    /// Create a provider whose client talks to MongoDB through [`MongoStore`].
    #[must_use]
    pub fn mongo() -> Self {
        Self::new(MongoStore::connector)
    }

    /// Create a provider over an existing store.
    #[must_use]
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(move |_| Ok(Arc::clone(&store)))
    }

    /// The client, created from `config` on first call.
    ///
    /// Later calls return the same client whatever `config` they pass.
    /// Concurrent first calls build exactly one client.
    ///
    /// # Errors
    ///
    /// Propagates the connector's error; nothing is stored in that case.
    pub fn create(&self, config: &ConnectionConfig) -> DbResult<Arc<DbClient>> {
        self.client
            .get_or_try_init(|| {
                let store = (self.connector)(config)?;
                Ok::<_, DbError>(Arc::new(DbClient::new(config, store)))
            })
            .map(Arc::clone)
    }

    /// The client, if one has been created.
    #[must_use]
    pub fn get(&self) -> Option<Arc<DbClient>> {
        self.client.get().cloned()
    }
}

impl fmt::Debug for DbClientProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbClientProvider")
            .field("client", &self.client.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionSettings;
    use crate::error::StoreError;
    use crate::memory::MemoryStore;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use test_utils::fixtures::{env_lookup, sample_db_env};

    fn config() -> ConnectionConfig {
        let env = env_lookup(sample_db_env());
        ConnectionConfig::resolve_with(ConnectionSettings::default(), env).unwrap()
    }

    fn other_config() -> ConnectionConfig {
        let settings = ConnectionSettings::default()
            .with_username("other")
            .with_password("pw")
            .with_host("elsewhere.example.net");
        ConnectionConfig::resolve_with(settings, |_| None).unwrap()
    }

    fn client(store: &Arc<MemoryStore>) -> DbClient {
        DbClient::new(&config(), Arc::clone(store) as Arc<dyn DocumentStore>)
    }

    #[test]
    fn test_provider_returns_same_client() {
        let provider = DbClientProvider::with_store(Arc::new(MemoryStore::new()));
        assert!(provider.get().is_none());

        let first = provider.create(&config()).unwrap();
        let second = provider.create(&other_config()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &provider.get().unwrap()));
    }

    #[test]
    fn test_mongo_provider_builds_unconnected_client() {
        let provider = DbClientProvider::mongo();
        let client = provider.create(&config()).unwrap();
        assert!(!client.is_connected());
        assert_eq!(client.options(), config().options());
    }

    #[test]
    fn test_concurrent_creates_call_connector_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = DbClientProvider::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            Ok(Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>)
        });
        let config = config();

        let clients: Vec<Arc<DbClient>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| provider.create(&config).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(clients.iter().all(|c| Arc::ptr_eq(c, &clients[0])));
    }

    #[test]
    fn test_connector_failure_is_not_stored() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let provider = DbClientProvider::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DbError::configuration("driver rejected options"))
            } else {
                Ok(Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>)
            }
        });

        assert!(matches!(
            provider.create(&config()),
            Err(DbError::Configuration(_))
        ));
        assert!(provider.get().is_none());
        assert!(provider.create(&config()).is_ok());
    }

    #[tokio::test]
    async fn test_connect_returns_named_database() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);

        let db = client.connect("app").await.unwrap();
        assert_eq!(db.name(), "app");
        assert!(client.is_connected());
        assert_eq!(client.connect("app").await.unwrap(), db);
        assert_ne!(client.connect("billing").await.unwrap(), db);
        assert_eq!(store.handshake_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_connects_share_one_handshake() {
        let store = Arc::new(MemoryStore::new().with_handshake_delay(Duration::from_millis(50)));
        let client = client(&store);

        let results = futures::future::join_all((0..10).map(|_| client.connect("app"))).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(store.handshake_count(), 1);
    }

    #[tokio::test]
    async fn test_handshake_failure_propagates_and_retries() {
        let store = Arc::new(MemoryStore::new());
        store.set_reachable(false);
        let client = client(&store);

        let err = client.connect("app").await.unwrap_err();
        assert!(matches!(err, DbError::Store(StoreError::Connection(_))));
        assert!(!client.is_connected());

        store.set_reachable(true);
        client.connect("app").await.unwrap();
        assert_eq!(store.handshake_count(), 2);
    }

    #[tokio::test]
    async fn test_reconnects_after_connection_loss() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);
        client.connect("app").await.unwrap();

        // The driver dropped the connection underneath the client.
        store.close().await.unwrap();
        assert!(!client.is_connected());

        client.connect("app").await.unwrap();
        assert!(client.is_connected());
        assert_eq!(store.handshake_count(), 2);

        client.connect("app").await.unwrap();
        assert_eq!(store.handshake_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_reconnects_share_one_handshake() {
        let store = Arc::new(MemoryStore::new().with_handshake_delay(Duration::from_millis(20)));
        let client = client(&store);
        client.connect("app").await.unwrap();
        store.close().await.unwrap();

        let results = futures::future::join_all((0..10).map(|_| client.connect("app"))).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(store.handshake_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected_without_handshake() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);
        assert!(matches!(
            client.connect("").await,
            Err(DbError::InvalidName(_))
        ));
        assert_eq!(store.handshake_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);
        client.connect("app").await.unwrap();

        client.disconnect().await.unwrap();
        client.disconnect().await.unwrap();
        assert!(!client.is_connected());
        assert!(!store.is_connected());
        assert!(matches!(
            client.connect("app").await,
            Err(DbError::ClientClosed)
        ));
    }

    #[test]
    fn test_debug_hides_uri() {
        let store = Arc::new(MemoryStore::new());
        let debug = format!("{:?}", client(&store));
        assert!(debug.contains("cluster0.example.net"));
        assert!(!debug.contains("s3cr3t"));
    }
}
