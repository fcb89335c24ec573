//! Connection configuration.
//!
//! A [`ConnectionConfig`] is resolved once at startup from explicit
//! [`ConnectionSettings`] and the `DB_*` environment variables, then handed to
//! [`crate::DbClientProvider::create`].

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sdk_logger::ClientLogger;
use url::form_urlencoded;

use crate::error::{DbError, DbResult};

/// Environment variable holding the database user.
pub const DB_USERNAME_ENV: &str = "DB_USERNAME";
/// Environment variable holding the database password.
pub const DB_PASSWORD_ENV: &str = "DB_PASSWORD";
/// Environment variable holding the database host.
pub const DB_HOST_URI_ENV: &str = "DB_HOST_URI";
/// Environment variable holding the authentication database.
pub const DB_AUTH_SOURCE_ENV: &str = "DB_AUTH_SOURCE";
/// Authentication database used when none is configured.
pub const DEFAULT_AUTH_SOURCE: &str = "admin";
/// Default connection pool ceiling.
pub const DEFAULT_MAX_POOL_SIZE: u32 = 5;

/// Driver settings passed through to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    /// Maximum pooled connections
    pub max_pool_size: u32,
    /// Minimum pooled connections
    pub min_pool_size: Option<u32>,
    /// Connection establishment timeout
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout
    pub server_selection_timeout: Option<Duration>,
    /// Application name reported to the server
    pub app_name: Option<String>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            min_pool_size: None,
            connect_timeout: None,
            server_selection_timeout: None,
            app_name: None,
        }
    }
}

impl DriverOptions {
    /// Set the pool ceiling.
    #[must_use]
    pub const fn with_max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Set the pool floor.
    #[must_use]
    pub const fn with_min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set server selection timeout.
    #[must_use]
    pub const fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = Some(timeout);
        self
    }

    /// Set the application name.
    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }
}

/// Connection string scheme and query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriParams {
    /// URI scheme
    pub scheme: String,
    /// Write concern (`w`)
    pub write_concern: String,
    /// Retry writes once on transient errors
    pub retry_writes: bool,
    /// Require TLS
    pub tls: bool,
    /// Replica set name
    pub replica_set: Option<String>,
    /// Read preference
    pub read_preference: Option<String>,
}

impl Default for UriParams {
    fn default() -> Self {
        Self {
            scheme: "mongodb+srv".to_string(),
            write_concern: "majority".to_string(),
            retry_writes: true,
            tls: true,
            replica_set: None,
            read_preference: None,
        }
    }
}

impl UriParams {
    /// Set the scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Set the write concern.
    #[must_use]
    pub fn with_write_concern(mut self, w: impl Into<String>) -> Self {
        self.write_concern = w.into();
        self
    }

    /// Enable or disable retryable writes.
    #[must_use]
    pub const fn with_retry_writes(mut self, enabled: bool) -> Self {
        self.retry_writes = enabled;
        self
    }

    /// Enable or disable TLS.
    #[must_use]
    pub const fn with_tls(mut self, enabled: bool) -> Self {
        self.tls = enabled;
        self
    }

    /// Set the replica set name.
    #[must_use]
    pub fn with_replica_set(mut self, name: impl Into<String>) -> Self {
        self.replica_set = Some(name.into());
        self
    }

    /// Set the read preference.
    #[must_use]
    pub fn with_read_preference(mut self, preference: impl Into<String>) -> Self {
        self.read_preference = Some(preference.into());
        self
    }

    fn query(&self, auth_source: &str) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("authSource", auth_source);
        if let Some(replica_set) = &self.replica_set {
            query.append_pair("replicaSet", replica_set);
        }
        query.append_pair("w", &self.write_concern);
        if let Some(read_preference) = &self.read_preference {
            query.append_pair("readPreference", read_preference);
        }
        query.append_pair("retryWrites", bool_str(self.retry_writes));
        query.append_pair("ssl", bool_str(self.tls));
        query.finish()
    }
}

const fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Percent-encode a user name or password for the userinfo part of a URI.
fn encode_userinfo(value: &str) -> String {
    // byte_serialize writes spaces as '+'; literal '+' is already "%2B".
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Explicit connection settings. Unset or empty fields fall back to the
/// environment.
#[derive(Debug, Default)]
pub struct ConnectionSettings {
    /// Database user
    pub username: Option<String>,
    /// Database password
    pub password: Option<SecretString>,
    /// Host, or comma-separated host list
    pub host: Option<String>,
    /// Authentication database
    pub auth_source: Option<String>,
    /// Driver options
    pub options: Option<DriverOptions>,
    /// Connection string parameters
    pub uri_params: Option<UriParams>,
}

impl ConnectionSettings {
    /// Set the user.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Set the host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the authentication database.
    #[must_use]
    pub fn with_auth_source(mut self, auth_source: impl Into<String>) -> Self {
        self.auth_source = Some(auth_source.into());
        self
    }

    /// Set driver options.
    #[must_use]
    pub fn with_options(mut self, options: DriverOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Set connection string parameters.
    #[must_use]
    pub fn with_uri_params(mut self, params: UriParams) -> Self {
        self.uri_params = Some(params);
        self
    }
}

/// Resolved, immutable connection configuration.
///
/// The connection string embeds the password, so it is kept as a secret and
/// never printed by `Debug`.
#[derive(Debug)]
pub struct ConnectionConfig {
    connection_uri: SecretString,
    options: DriverOptions,
    host: String,
}

impl ConnectionConfig {
    /// Resolve from the process environment only.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Configuration`] if user, password or host is missing.
    pub fn from_env() -> DbResult<Self> {
        Self::resolve(ConnectionSettings::default())
    }

    /// Resolve explicit settings, falling back to the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Configuration`] if user, password or host is missing.
    pub fn resolve(settings: ConnectionSettings) -> DbResult<Self> {
        Self::resolve_with(settings, |key| std::env::var(key).ok())
    }

    /// Resolve explicit settings, falling back to `env` for unset fields.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Configuration`] if user, password or host is missing.
    pub fn resolve_with<F>(settings: ConnectionSettings, env: F) -> DbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let logger = ClientLogger::new("DbClientConfiguration");
        let from_env = |key: &str| non_empty(env(key));

        let username = non_empty(settings.username).or_else(|| from_env(DB_USERNAME_ENV));
        let password = settings
            .password
            .filter(|p| !p.expose_secret().is_empty())
            .or_else(|| from_env(DB_PASSWORD_ENV).map(SecretString::from));
        let host = non_empty(settings.host).or_else(|| from_env(DB_HOST_URI_ENV));
        let auth_source = non_empty(settings.auth_source)
            .or_else(|| from_env(DB_AUTH_SOURCE_ENV))
            .unwrap_or_else(|| DEFAULT_AUTH_SOURCE.to_string());

        let (Some(username), Some(password), Some(host)) =
            (username.as_ref(), password.as_ref(), host.as_ref())
        else {
            let missing: Vec<&str> = [
                (username.is_none(), DB_USERNAME_ENV),
                (password.is_none(), DB_PASSWORD_ENV),
                (host.is_none(), DB_HOST_URI_ENV),
            ]
            .into_iter()
            .filter_map(|(absent, name)| absent.then_some(name))
            .collect();
            logger.error("Could not load driver configuration from environment.");
            return Err(DbError::configuration(format!(
                "missing {}",
                missing.join(", ")
            )));
        };

        let params = settings.uri_params.unwrap_or_default();
        let connection_uri = format!(
            "{}://{}:{}@{}?{}",
            params.scheme,
            encode_userinfo(username),
            encode_userinfo(password.expose_secret()),
            host,
            params.query(&auth_source),
        );
        logger.verbose("Successfully created connection configuration.");

        Ok(Self {
            connection_uri: SecretString::from(connection_uri),
            options: settings.options.unwrap_or_default(),
            host: host.clone(),
        })
    }

    /// Full connection string, credentials included.
    #[must_use]
    pub fn connection_uri(&self) -> &str {
        self.connection_uri.expose_secret()
    }

    /// Driver options.
    #[must_use]
    pub const fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Host part of the connection string.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
