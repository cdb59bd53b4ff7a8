use reqwest::Client;
use tracing::debug;

use super::types::CoreResponse;
use super::{BackendError, PaperSearch, REQUEST_TIMEOUT, RetryPolicy, read_json};
use crate::config::{ApiKey, Endpoint};
use crate::record::{ResultRecord, SourceId};

/// Client for the open-access aggregator's work search (CORE style).
///
/// Full texts are excluded from responses; results come back sorted by relevance.
#[derive(Clone)]
pub struct CoreClient {
    http: Client,
    url: String,
    key: ApiKey,
    limit: u32,
    retry: RetryPolicy,
}

impl CoreClient {
    pub fn new(http: Client, endpoint: &Endpoint, limit: u32) -> Self {
        Self {
            http,
            url: endpoint.url.clone(),
            key: endpoint.key.clone(),
            limit,
            retry: RetryPolicy::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
            key: ApiKey::new("test-key"),
            limit: 10,
            retry: RetryPolicy::none(),
        }
    }

    async fn search_once(&self, query: &str) -> Result<Vec<ResultRecord>, BackendError> {
        let limit = self.limit.to_string();
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("q", query),
                ("exclude", "fullText"),
                ("limit", limit.as_str()),
                ("sort", "relevance"),
            ])
            .bearer_auth(self.key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let body: CoreResponse = read_json(SourceId::Core, response).await?;
        debug!(works = body.results.len(), "core search complete");
        Ok(body.results.into_iter().map(ResultRecord::from).collect())
    }
}

impl PaperSearch for CoreClient {
    fn source(&self) -> SourceId {
        SourceId::Core
    }

    async fn search(&self, query: &str) -> Result<Vec<ResultRecord>, BackendError> {
        self.retry
            .run(SourceId::Core, || self.search_once(query))
            .await
    }
}
