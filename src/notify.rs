//! Chat notifications for finished (or failed) reports.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ApiKey, SlackConfig};
use crate::publish::PublishedDataset;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("chat rate limit exceeded")]
    RateLimited,

    #[error("chat API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: TextObject,
}

impl Block {
    fn section(text: String) -> Self {
        Self {
            kind: "section",
            text: TextObject {
                kind: "mrkdwn",
                text,
            },
        }
    }
}

/// Body of a `chat.postMessage` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagePayload {
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

/// Escape the characters mrkdwn treats as control sequences: `&`, `<`, `>`.
fn escape_mrkdwn(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' | '\r' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

fn emoji_for(dataset: &str) -> &'static str {
    match dataset {
        "research" => ":chart_with_upwards_trend:",
        "news" => ":newspaper:",
        "patents" => ":page_facing_up:",
        _ => ":bookmark_tabs:",
    }
}

/// One bullet per dataset, each linking to it by name.
pub fn links_payload(channel: &str, datasets: &[PublishedDataset]) -> MessagePayload {
    let text = datasets
        .iter()
        .map(|d| {
            format!(
                "• {} <{}|{}>",
                emoji_for(&d.name),
                escape_mrkdwn(&d.link).replace('|', "%7C"),
                escape_mrkdwn(&d.name)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    MessagePayload {
        channel: channel.to_string(),
        text: None,
        blocks: vec![Block::section(text)],
    }
}

pub fn processing_payload(channel: &str) -> MessagePayload {
    MessagePayload {
        channel: channel.to_string(),
        text: Some("Processing...".to_string()),
        blocks: Vec::new(),
    }
}

pub fn failure_payload(channel: &str, query: &str, error: &str) -> MessagePayload {
    let text = format!(
        ":warning: Report for `{}` failed: {}",
        escape_mrkdwn(query),
        escape_mrkdwn(error)
    );
    MessagePayload {
        channel: channel.to_string(),
        text: None,
        blocks: vec![Block::section(text)],
    }
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts messages to a Slack-compatible `chat.postMessage` endpoint.
#[derive(Clone)]
pub struct SlackNotifier {
    http: Client,
    token: ApiKey,
    api_url: String,
}

impl SlackNotifier {
    pub fn new(http: Client, config: &SlackConfig) -> Self {
        Self {
            http,
            token: config.token.clone(),
            api_url: config.api_url.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, api_url: &str) -> Self {
        Self {
            http,
            token: ApiKey::new("xoxb-test"),
            api_url: api_url.to_string(),
        }
    }

    pub async fn post(&self, payload: &MessagePayload) -> Result<(), NotifyError> {
        let url = format!("{}/chat.postMessage", self.api_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.token.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("chat API rate limited");
            return Err(NotifyError::RateLimited);
        }
        if !status.is_success() {
            warn!(status = %status, "chat API error");
            return Err(NotifyError::Api(format!("HTTP {status}")));
        }

        // The chat API reports failures in the body with a 200 status.
        let body: PostMessageResponse = response.json().await?;
        if !body.ok {
            let error = body.error.unwrap_or_else(|| "unknown_error".to_string());
            warn!(error = %error, channel = %payload.channel, "chat message rejected");
            return Err(NotifyError::Api(error));
        }
        debug!(channel = %payload.channel, "chat message posted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn dataset(name: &str, link: &str) -> PublishedDataset {
        PublishedDataset {
            name: name.to_string(),
            id: Uuid::nil(),
            link: link.to_string(),
        }
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_mrkdwn("plain text"), "plain text");
        assert_eq!(escape_mrkdwn("a<b>&c\nd"), "a&lt;b&gt;&amp;c d");
    }

    #[test]
    fn links_payload_has_one_bullet_per_dataset() {
        let payload = links_payload(
            "C123",
            &[
                dataset("research", "reports/r.json"),
                dataset("news", "reports/n.json"),
            ],
        );
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["channel"], "C123");
        assert_eq!(json["blocks"][0]["type"], "section");
        assert_eq!(json["blocks"][0]["text"]["type"], "mrkdwn");
        assert_eq!(
            json["blocks"][0]["text"]["text"],
            "• :chart_with_upwards_trend: <reports/r.json|research>\n• :newspaper: <reports/n.json|news>"
        );
        assert!(json.get("text").is_none());
    }

    #[test]
    fn link_with_pipe_cannot_break_out_of_the_link() {
        let payload = links_payload("C1", &[dataset("patents", "reports/a | b/p.json")]);
        assert_eq!(
            payload.blocks[0].text.text,
            "• :page_facing_up: <reports/a %7C b/p.json|patents>"
        );
    }

    #[test]
    fn failure_payload_names_query_and_error() {
        let payload = failure_payload("C1", "solar <x>", "all paper backends failed");
        assert_eq!(
            payload.blocks[0].text.text,
            ":warning: Report for `solar &lt;x&gt;` failed: all paper backends failed"
        );
    }

    mod http {
        use super::*;
        use wiremock::matchers::{body_partial_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        #[tokio::test]
        async fn post_sends_bearer_token_and_payload() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat.postMessage"))
                .and(header("Authorization", "Bearer xoxb-test"))
                .and(body_partial_json(serde_json::json!({"channel": "C1", "text": "Processing..."})))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
                .expect(1)
                .mount(&server)
                .await;

            let notifier = SlackNotifier::with_base_url(Client::new(), &server.uri());
            notifier.post(&processing_payload("C1")).await.unwrap();
        }

        #[tokio::test]
        async fn ok_false_is_an_api_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({"ok": false, "error": "channel_not_found"})),
                )
                .mount(&server)
                .await;

            let notifier = SlackNotifier::with_base_url(Client::new(), &server.uri());
            let err = notifier.post(&processing_payload("C404")).await.unwrap_err();
            assert!(matches!(err, NotifyError::Api(ref e) if e == "channel_not_found"), "got: {err}");
        }

        #[tokio::test]
        async fn too_many_requests_is_rate_limited() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(429))
                .mount(&server)
                .await;

            let notifier = SlackNotifier::with_base_url(Client::new(), &server.uri());
            assert!(matches!(
                notifier.post(&processing_payload("C1")).await,
                Err(NotifyError::RateLimited)
            ));
        }
    }
}
