use reqwest::Client;
use tracing::debug;

use super::types::SemanticResponse;
use super::{BackendError, PaperSearch, REQUEST_TIMEOUT, RetryPolicy, read_json};
use crate::config::{ApiKey, Endpoint};
use crate::record::{ResultRecord, SourceId};

/// Fields requested for every paper.
const FIELDS: &[&str] = &["url", "title", "abstract", "year", "authors"];

/// Client for the structured-research paper search (Semantic Scholar style).
#[derive(Clone)]
pub struct SemanticClient {
    http: Client,
    url: String,
    key: ApiKey,
    limit: u32,
    retry: RetryPolicy,
}

impl SemanticClient {
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
        let fields = FIELDS.join(",");
        let limit = self.limit.to_string();
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("query", query),
                ("fields", fields.as_str()),
                ("limit", limit.as_str()),
            ])
            .header("Authorization", self.key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let body: SemanticResponse = read_json(SourceId::SemanticScholar, response).await?;
        debug!(papers = body.data.len(), "semantic search complete");
        Ok(body.data.into_iter().map(ResultRecord::from).collect())
    }
}

impl PaperSearch for SemanticClient {
    fn source(&self) -> SourceId {
        SourceId::SemanticScholar
    }

    async fn search(&self, query: &str) -> Result<Vec<ResultRecord>, BackendError> {
        self.retry
            .run(SourceId::SemanticScholar, || self.search_once(query))
            .await
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_sends_plain_query_and_projects_papers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/search"))
            .and(query_param("query", "solar battery"))
            .and(query_param("fields", "url,title,abstract,year,authors"))
            .and(query_param("limit", "10"))
            .and(header("Authorization", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 1,
                "data": [{
                    "paperId": "abc",
                    "url": "https://semantic.example/abc",
                    "title": "Solar Battery Breakthrough",
                    "abstract": "Storage at scale",
                    "year": 2023,
                    "authors": [{"authorId": "1", "name": "Ada"}]
                }]
            })))
            .mount(&server)
            .await;

        let client =
            SemanticClient::with_base_url(Client::new(), &format!("{}/paper/search", server.uri()));
        let papers = client.search("solar battery").await.unwrap();

        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title.as_deref(), Some("Solar Battery Breakthrough"));
        assert_eq!(papers[0].year, Some(2023));
        assert_eq!(papers[0].authors, vec!["Ada"]);
    }

    #[tokio::test]
    async fn missing_data_field_is_an_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"total": 0})))
            .mount(&server)
            .await;

        let client = SemanticClient::with_base_url(Client::new(), &server.uri());
        assert!(client.search("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_status_carries_body_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "Unrecognized field"})),
            )
            .mount(&server)
            .await;

        let client = SemanticClient::with_base_url(Client::new(), &server.uri());
        match client.search("x").await {
            Err(BackendError::Api { code: 400, message }) => {
                assert_eq!(message, "Unrecognized field");
            }
            other => panic!("expected Api(400), got: {other:?}"),
        }
    }
}
