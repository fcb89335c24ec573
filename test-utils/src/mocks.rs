//! Mock implementations for testing.

use async_trait::async_trait;
use sdk_http_client::{HttpOutcome, HttpResult, HttpTransport, RequestOptions};
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// A request captured by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Target passed to the transport
    pub target: String,
    /// Options passed to the transport
    pub options: RequestOptions,
}

/// Transport that replays scripted outcomes and records every request.
///
/// When the script is exhausted it returns `200` with a `null` body.
#[derive(Debug, Default)]
pub struct MockTransport {
    outcomes: RwLock<VecDeque<HttpOutcome>>,
    requests: RwLock<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Create a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that replays `outcomes` in order.
    #[must_use]
    pub fn with_outcomes(outcomes: impl IntoIterator<Item = HttpOutcome>) -> Self {
        Self {
            outcomes: RwLock::new(outcomes.into_iter().collect()),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Append an outcome to the script.
    pub async fn push_outcome(&self, outcome: HttpOutcome) {
        self.outcomes.write().await.push_back(outcome);
    }

    /// All requests performed so far.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Number of requests performed.
    pub async fn count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn perform(&self, target: &str, options: RequestOptions) -> HttpResult<HttpOutcome> {
        self.requests.write().await.push(RecordedRequest {
            target: target.to_string(),
            options,
        });

        Ok(self
            .outcomes
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| HttpOutcome::new(200, serde_json::Value::Null)))
    }
}
