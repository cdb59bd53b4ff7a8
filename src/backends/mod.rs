//! HTTP adapters for the external search backends.
//!
//! Every adapter projects its backend's JSON into [`ResultRecord`]s; fields a
//! backend leaves out stay empty rather than failing the row.

pub mod news;
pub mod openaccess;
pub mod patents;
pub mod semantic;
mod types;

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::record::{ResultRecord, SourceId};

pub use news::NewsClient;
pub use openaccess::CoreClient;
pub use patents::PatentClient;
pub use semantic::SemanticClient;
pub use types::Story;

/// Per-request timeout on top of the shared client's global timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl BackendError {
    fn is_retriable(&self) -> bool {
        match self {
            BackendError::RateLimited => true,
            BackendError::Api { code, .. } => (500..=599).contains(code),
            BackendError::Network(e) => e.is_timeout() || e.is_connect(),
        }
    }
}

/// A backend that answers a query string with research papers.
pub trait PaperSearch {
    fn source(&self) -> SourceId;

    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<ResultRecord>, BackendError>> + Send;
}

/// A backend that lists news stories for free text plus a category filter.
pub trait NewsSearch {
    fn list_stories(
        &self,
        text: &str,
        aql: &str,
    ) -> impl Future<Output = Result<Vec<Story>, BackendError>> + Send;
}

/// Bounded retry for transient failures (429, 5xx, connect/timeout).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    #[cfg(test)]
    pub(crate) fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    pub(crate) async fn run<T, F, Fut>(&self, source: SourceId, mut op: F) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retriable() && attempt + 1 < attempts => {
                    let delay = self.jittered_backoff(attempt);
                    debug!(
                        %source,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Equal jitter backoff: base/2 + rand(0, base/2).
    fn jittered_backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_millis() as u64 * 2u64.pow(attempt);
        let half = base / 2;
        Duration::from_millis(half + fastrand::u64(..half.max(1)))
    }
}

/// Classify the response status and decode a successful JSON body.
async fn read_json<T: DeserializeOwned>(
    source: SourceId,
    response: Response,
) -> Result<T, BackendError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!(%source, "backend rate limited");
        return Err(BackendError::RateLimited);
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = extract_error_message(&text);
        warn!(%source, status = %status, "backend returned an error");
        return Err(BackendError::Api {
            code: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error", "detail"]
                .iter()
                .find_map(|key| v[*key].as_str().map(String::from))
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}
