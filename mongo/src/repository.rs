//! User account lookups.

use std::sync::Arc;

use sdk_crypto::{HashOptions, verify_hash};
use sdk_logger::ClientLogger;
use serde_json::Value;
use tracing::instrument;

use crate::dao::BaseDao;
use crate::error::DbResult;
use crate::model::{Document, FindOptions};

/// Field holding the login name.
pub const USERNAME_FIELD: &str = "username";

/// Repository over a collection of user documents shaped like
/// `{ "username": ..., "credentials": { "password": "<salt>:<key>" } }`.
#[derive(Debug, Clone)]
pub struct UserRepository {
    dao: Arc<BaseDao>,
    hash_options: HashOptions,
    logger: ClientLogger,
}

impl UserRepository {
    /// Create a repository using the default hash options.
    #[must_use]
    pub fn new(dao: Arc<BaseDao>) -> Self {
        Self {
            dao,
            hash_options: HashOptions::default(),
            logger: ClientLogger::new("UserRepository"),
        }
    }

    /// Use the options the stored hashes were generated with.
    #[must_use]
    pub fn with_hash_options(mut self, options: HashOptions) -> Self {
        self.hash_options = options;
        self
    }

    /// The underlying accessor.
    #[must_use]
    pub fn dao(&self) -> &BaseDao {
        &self.dao
    }

    /// Check a password against the stored credential hash.
    ///
    /// Unknown users, users without a stored credential and wrong passwords
    /// all yield `false`.
    ///
    /// # Errors
    ///
    /// Propagates store errors and malformed stored hashes.
    #[instrument(skip(self, password))]
    pub async fn validate_user_by_password(
        &self,
        username: &str,
        password: &str,
    ) -> DbResult<bool> {
        let mut filter = Document::new();
        filter.insert(USERNAME_FIELD.to_string(), Value::String(username.to_string()));

        let Some(user) = self.dao.find_one(filter, FindOptions::default()).await? else {
            self.logger.verbose(format!("Unknown user {username}"));
            return Ok(false);
        };

        let Some(hash) = user
            .get("credentials")
            .and_then(|credentials| credentials.get("password"))
            .and_then(Value::as_str)
        else {
            self.logger.warning(format!("User {username} has no stored password"));
            return Ok(false);
        };

        let valid = verify_hash(password, hash, &self.hash_options).inspect_err(|e| {
            self.logger.error(format!("Stored hash for {username} is unusable: {e}"));
        })?;
        if !valid {
            self.logger.verbose(format!("Invalid password for {username}"));
        }
        Ok(valid)
    }
}
