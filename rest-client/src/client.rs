//! REST façade over an [`HttpTransport`].

use crate::auth::{CredentialError, GetTokenOptions, TokenCredential};
use crate::classify::classify;
use crate::error::{RestClientError, RestResult};
use sdk_http_client::{HttpClient, HttpClientConfig, HttpMethod, HttpTransport, RequestOptions};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// REST client returning response bodies for 200 and classified errors otherwise.
pub struct RestClient<T = HttpClient> {
    transport: T,
    credential: Option<Arc<dyn TokenCredential>>,
    scopes: Vec<String>,
}

impl RestClient<HttpClient> {
    /// Create a client backed by a reqwest [`HttpClient`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built from `config`.
    pub fn new(config: HttpClientConfig) -> RestResult<Self> {
        Ok(Self::with_transport(HttpClient::new(config)?))
    }
}

impl<T: HttpTransport> RestClient<T> {
    /// Create a client over any transport.
    #[must_use]
    pub const fn with_transport(transport: T) -> Self {
        Self {
            transport,
            credential: None,
            scopes: Vec::new(),
        }
    }

    /// Attach a bearer token credential requested for `scopes`.
    #[must_use]
    pub fn with_credential(
        mut self,
        credential: Arc<dyn TokenCredential>,
        scopes: Vec<String>,
    ) -> Self {
        self.credential = Some(credential);
        self.scopes = scopes;
        self
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    async fn authorize(&self, options: &mut RequestOptions) -> RestResult<()> {
        let Some(credential) = &self.credential else {
            return Ok(());
        };

        let token = credential
            .get_token(&self.scopes, &GetTokenOptions::default())
            .await?
            .ok_or_else(|| CredentialError::unavailable("no token returned"))?;
        if token.is_expired() {
            return Err(CredentialError::Expired.into());
        }

        options
            .headers
            .insert("authorization".to_string(), format!("Bearer {}", token.token()));
        Ok(())
    }

    /// Perform a request and classify the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`RestClientError::Classified`] for any status other than 200,
    /// [`RestClientError::Http`] when no response was received, and
    /// [`RestClientError::Credential`] when a configured credential fails.
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn request(&self, target: &str, mut options: RequestOptions) -> RestResult<Value> {
        self.authorize(&mut options).await?;

        let outcome = self.transport.perform(target, options).await?;
        let status = outcome.status;

        classify(outcome).map_err(|e| {
            debug!(status, kind = %e.kind(), "Request failed");
            RestClientError::from(e)
        })
    }

    /// Perform a request and deserialise the body.
    ///
    /// # Errors
    ///
    /// As [`RestClient::request`], plus [`RestClientError::Deserialize`] if
    /// the body does not match `R`.
    pub async fn request_as<R: DeserializeOwned>(
        &self,
        target: &str,
        options: RequestOptions,
    ) -> RestResult<R> {
        let body = self.request(target, options).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// GET request.
    ///
    /// # Errors
    ///
    /// See [`RestClient::request`].
    pub async fn get(&self, target: &str, options: RequestOptions) -> RestResult<Value> {
        self.request(target, options.with_method(HttpMethod::Get)).await
    }

    /// DELETE request.
    ///
    /// # Errors
    ///
    /// See [`RestClient::request`].
    pub async fn delete(&self, target: &str, options: RequestOptions) -> RestResult<Value> {
        self.request(target, options.with_method(HttpMethod::Delete)).await
    }

    /// POST request.
    ///
    /// # Errors
    ///
    /// See [`RestClient::request`].
    pub async fn post(&self, target: &str, options: RequestOptions) -> RestResult<Value> {
        self.request(target, options.with_method(HttpMethod::Post)).await
    }

    /// PUT request.
    ///
    /// # Errors
    ///
    /// See [`RestClient::request`].
    pub async fn put(&self, target: &str, options: RequestOptions) -> RestResult<Value> {
        self.request(target, options.with_method(HttpMethod::Put)).await
    }

    /// PATCH request.
    ///
    /// # Errors
    ///
    /// See [`RestClient::request`].
    pub async fn patch(&self, target: &str, options: RequestOptions) -> RestResult<Value> {
        self.request(target, options.with_method(HttpMethod::Patch)).await
    }
}
