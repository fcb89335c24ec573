//! Change-event broker.
//!
//! [`DbEvents`] watches the collection of a [`BaseDao`] and fans each change
//! out to the registered handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use sdk_logger::ClientLogger;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::dao::BaseDao;
use crate::error::DbResult;
use crate::store::{ChangeEvent, OperationType};

/// Change delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeNotification {
    /// Insert, update or delete
    pub operation: OperationType,
    /// Database name
    pub db: String,
    /// Collection name
    pub collection: String,
    /// Full document for inserts and updates, document key for deletes
    pub document: Value,
    /// When the change happened
    pub time: DateTime<Utc>,
}

/// Callback invoked for every notification.
pub type ChangeHandler = Arc<dyn Fn(&ChangeNotification) + Send + Sync>;

/// Identifies a subscription for [`DbEvents::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observers = Arc<RwLock<Vec<(SubscriptionId, ChangeHandler)>>>;

/// Broker delivering collection changes to subscribers.
pub struct DbEvents {
    dao: Arc<BaseDao>,
    observers: Observers,
    next_id: AtomicU64,
    watcher: Mutex<Option<JoinHandle<()>>>,
    logger: ClientLogger,
}

impl DbEvents {
    /// Create a broker for the collection behind `dao`. Nothing is watched
    /// until the first subscription.
    #[must_use]
    pub fn new(dao: Arc<BaseDao>) -> Self {
        Self {
            dao,
            observers: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(1),
            watcher: Mutex::new(None),
            logger: ClientLogger::new("DbEvents"),
        }
    }

    /// Register a handler and make sure the collection is being watched.
    ///
    /// The handler is registered before the watch opens, so it sees every
    /// change made after this call returns. A watch whose change stream has
    /// ended is reopened.
    ///
    /// # Errors
    ///
    /// Propagates errors opening the change stream; the handler is not
    /// registered in that case.
    pub async fn subscribe(&self, handler: ChangeHandler) -> DbResult<SubscriptionId> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.write().await.push((id, handler));

        if let Err(e) = self.ensure_watching().await {
            self.unsubscribe(id).await;
            return Err(e);
        }
        Ok(id)
    }

    async fn ensure_watching(&self) -> DbResult<()> {
        let mut watcher = self.watcher.lock().await;
        if watcher.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }

        let mut changes = self.dao.collection().await?.watch().await?;
        let observers = Arc::clone(&self.observers);
        let logger = self.logger.clone();
        logger.verbose(format!("Watching {}", self.dao.collection_name()));
        *watcher = Some(tokio::spawn(async move {
            while let Some(event) = changes.next().await {
                if let Some(notification) = Self::parse_change_event(&event) {
                    notify(&observers, &notification).await;
                }
            }
            logger.verbose("Change stream ended");
        }));
        Ok(())
    }

    /// Whether a change stream is currently being consumed.
    pub async fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Remove a handler; false if it was not registered.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write().await;
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Number of registered handlers.
    pub async fn subscriber_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Deliver a notification to every handler.
    pub async fn notify_all(&self, notification: &ChangeNotification) {
        notify(&self.observers, notification).await;
    }

    /// Map a raw change event to a notification.
    ///
    /// Inserts and updates carry the full document, deletes carry the
    /// document key. Other operations yield `None`.
    #[must_use]
    pub fn parse_change_event(event: &ChangeEvent) -> Option<ChangeNotification> {
        let document = match event.operation_type {
            OperationType::Insert | OperationType::Update => {
                Value::Object(event.full_document.clone()?)
            }
            OperationType::Delete => event.document_key.clone()?,
            OperationType::Replace | OperationType::Drop => return None,
        };
        Some(ChangeNotification {
            operation: event.operation_type,
            db: event.ns.db.clone(),
            collection: event.ns.coll.clone(),
            document,
            time: event.cluster_time,
        })
    }

    /// Stop watching. Handlers stay registered.
    pub async fn close(&self) {
        if let Some(handle) = self.watcher.lock().await.take() {
            handle.abort();
            self.logger.verbose("Stopped watching");
        }
    }
}

impl Drop for DbEvents {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.get_mut().take() {
            handle.abort();
        }
    }
}

async fn notify(
    observers: &RwLock<Vec<(SubscriptionId, ChangeHandler)>>,
    notification: &ChangeNotification,
) {
    let handlers: Vec<ChangeHandler> = observers
        .read()
        .await
        .iter()
        .map(|(_, handler)| Arc::clone(handler))
        .collect();
    for handler in handlers {
        handler(notification);
    }
}
