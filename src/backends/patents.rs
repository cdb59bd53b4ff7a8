use reqwest::Client;
use tracing::debug;

use super::types::{PatentQuery, PatentResponse};
use super::{BackendError, REQUEST_TIMEOUT, RetryPolicy, read_json};
use crate::config::{ApiKey, Endpoint};
use crate::record::{ResultRecord, SourceId};

/// Client for the patent search backend, which takes keyword lists rather
/// than query strings.
#[derive(Clone)]
pub struct PatentClient {
    http: Client,
    url: String,
    key: ApiKey,
    size: u32,
    retry: RetryPolicy,
}

impl PatentClient {
    pub fn new(http: Client, endpoint: &Endpoint, size: u32) -> Self {
        Self {
            http,
            url: endpoint.url.clone(),
            key: endpoint.key.clone(),
            size,
            retry: RetryPolicy::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
            key: ApiKey::new("test-key"),
            size: 10,
            retry: RetryPolicy::none(),
        }
    }

    /// Search with `primaryKeywords`; each entry must match, `(a b)` entries match either term.
    pub async fn search(&self, keywords: &[String]) -> Result<Vec<ResultRecord>, BackendError> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }
        self.retry
            .run(SourceId::Patents, || self.search_once(keywords))
            .await
    }

    async fn search_once(&self, keywords: &[String]) -> Result<Vec<ResultRecord>, BackendError> {
        let body = PatentQuery {
            primary_keywords: keywords,
            size: self.size,
            from: 0,
        };
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(self.key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let body: PatentResponse = read_json(SourceId::Patents, response).await?;
        debug!(patents = body.results.len(), "patent search complete");
        Ok(body.results.into_iter().map(ResultRecord::from).collect())
    }
}
