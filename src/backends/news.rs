use reqwest::Client;
use tracing::debug;

use super::types::{StoriesResponse, Story};
use super::{BackendError, NewsSearch, REQUEST_TIMEOUT, RetryPolicy, read_json};
use crate::config::{ApiKey, NewsConfig};
use crate::record::SourceId;

/// Client for the news story listing (AYLIEN News API style).
#[derive(Clone)]
pub struct NewsClient {
    http: Client,
    host: String,
    app_id: ApiKey,
    app_key: ApiKey,
    days_behind: u32,
    per_page: u32,
    retry: RetryPolicy,
}

impl NewsClient {
    pub fn new(http: Client, config: &NewsConfig) -> Self {
        Self {
            http,
            host: config.host.clone(),
            app_id: config.app_id.clone(),
            app_key: config.app_key.clone(),
            days_behind: config.days_behind,
            per_page: config.per_page,
            retry: RetryPolicy::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, host: &str) -> Self {
        Self {
            http,
            host: host.to_string(),
            app_id: ApiKey::new("test-id"),
            app_key: ApiKey::new("test-key"),
            days_behind: 90,
            per_page: 25,
            retry: RetryPolicy::none(),
        }
    }

    async fn list_once(&self, text: &str, aql: &str) -> Result<Vec<Story>, BackendError> {
        let url = format!("{}/stories", self.host);
        let start = format!("NOW-{}DAYS", self.days_behind);
        let per_page = self.per_page.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("text", text),
                ("aql", aql),
                ("language[]", "en"),
                ("published_at.start", start.as_str()),
                ("published_at.end", "NOW"),
                ("sort_by", "relevance"),
                ("cursor", "*"),
                ("per_page", per_page.as_str()),
            ])
            .header("X-AYLIEN-NewsAPI-Application-ID", self.app_id.expose())
            .header("X-AYLIEN-NewsAPI-Application-Key", self.app_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let body: StoriesResponse = read_json(SourceId::News, response).await?;
        debug!(stories = body.stories.len(), "story listing complete");
        Ok(body.stories)
    }
}

impl NewsSearch for NewsClient {
    async fn list_stories(&self, text: &str, aql: &str) -> Result<Vec<Story>, BackendError> {
        self.retry
            .run(SourceId::News, || self.list_once(text, aql))
            .await
    }
}
