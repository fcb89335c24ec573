//! Document store access for the service SDK.
//!
//! This crate provides:
//! - Connection configuration resolved from explicit settings and the
//!   `DB_*` environment variables
//! - [`DbClientProvider`] and [`DbClient`]: one client per composition root,
//!   with a single in-flight connection handshake
//! - [`Database`] and [`Collection`] handles over a [`DocumentStore`]
//! - [`BaseDao`], a CRUD accessor that stamps `createdAt`/`updatedAt`
//! - [`DbEvents`], a change-event broker, and [`UserRepository`]
//! - [`MongoStore`], the [`DocumentStore`] backed by the MongoDB driver, and
//!   [`MemoryStore`], an in-process one

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod dao;
pub mod database;
pub mod driver;
pub mod error;
pub mod events;
pub mod memory;
pub mod model;
pub mod repository;
pub mod store;

pub use client::{DbClient, DbClientProvider, StoreConnector};
pub use config::{ConnectionConfig, ConnectionSettings, DriverOptions, UriParams};
pub use dao::{BaseDao, DaoConfig};
pub use database::{Collection, Database};
pub use driver::MongoStore;
pub use error::{DbError, DbResult, StoreError, StoreResult};
pub use events::{ChangeHandler, ChangeNotification, DbEvents, SubscriptionId};
pub use memory::MemoryStore;
pub use model::{
    CreateCollectionOptions, DeleteResult, Document, FindOptions, InsertManyResult,
    InsertOneResult, SortOrder, UpdateOptions, UpdateResult,
};
pub use repository::UserRepository;
pub use store::{ChangeEvent, ChangeStream, DocumentStore, DocumentStream, Namespace, OperationType};
