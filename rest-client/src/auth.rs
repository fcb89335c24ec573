//! Token credentials for authenticated requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while obtaining a token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The credential could not provide a token
    #[error("Credential unavailable: {0}")]
    Unavailable(String),

    /// The provided token has already expired
    #[error("Access token expired")]
    Expired,
}

impl CredentialError {
    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// An access token with its expiry.
#[derive(Debug)]
pub struct AccessToken {
    token: SecretString,
    expires_on: DateTime<Utc>,
}

impl AccessToken {
    /// Create a token.
    #[must_use]
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            expires_on,
        }
    }

    /// The raw token value.
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// Expiry timestamp.
    #[must_use]
    pub const fn expires_on(&self) -> DateTime<Utc> {
        self.expires_on
    }

    /// Whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_on <= now
    }

    /// Whether the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Options for [`TokenCredential::get_token`].
#[derive(Debug, Clone, Default)]
pub struct GetTokenOptions {
    /// How long a token request may take
    pub timeout: Option<Duration>,
}

/// Something that can provide an access token for a set of scopes.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Get a token for `scopes`. `Ok(None)` means no token is available.
    async fn get_token(
        &self,
        scopes: &[String],
        options: &GetTokenOptions,
    ) -> Result<Option<AccessToken>, CredentialError>;
}

/// A credential that always returns the same token.
pub struct StaticTokenCredential {
    token: SecretString,
    expires_on: DateTime<Utc>,
}

impl StaticTokenCredential {
    /// Create a credential for a fixed token.
    #[must_use]
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            expires_on,
        }
    }
}

impl std::fmt::Debug for StaticTokenCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenCredential")
            .field("token", &"[REDACTED]")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(
        &self,
        _scopes: &[String],
        _options: &GetTokenOptions,
    ) -> Result<Option<AccessToken>, CredentialError> {
        Ok(Some(AccessToken::new(
            self.token.expose_secret(),
            self.expires_on,
        )))
    }
}
