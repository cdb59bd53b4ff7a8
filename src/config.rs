//! Process-wide settings, read once from the environment at startup.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SEMANTIC_URL` / `SEMANTIC_KEY` | required | structured-research backend |
//! | `CORE_URL` / `CORE_KEY` | required | open-access aggregator |
//! | `PATENT_URL` / `PATENT_KEY` | unset | patent backend; skipped when unset |
//! | `AYLIEN_HOST` / `AYLIEN_APP_ID` / `AYLIEN_APP_KEY` | required | news backend |
//! | `PAPER_LIMIT` | `100` | results requested per paper backend |
//! | `PATENT_LIMIT` | `100` | results requested from the patent backend |
//! | `NEWS_DAYS_BEHIND` | `90` | news recency window |
//! | `NEWS_PER_PAGE` | `25` | stories per bucket query |
//! | `NEWS_PAUSE_MS` | `1000` | pause between bucket queries |
//! | `NEWS_DEDUP` | `exact` | `exact` or `containment` |
//! | `QUERY_NORMALIZE` | `substring` | `substring` or `token` |
//! | `EXACT_MATCH_STYLE` | `template` | `template` or `fields` |
//! | `EXACT_MATCH_TEMPLATE` | `"KEYWORD"` | must contain `KEYWORD` |
//! | `REPORT_DIR` | `reports` | where report folders are written |
//! | `SLACK_TOKEN` | unset | enables chat notifications |
//! | `SLACK_API_URL` | `https://slack.com/api` | chat API base |
//! | `JOB_MAX_CONCURRENT` | `2` | report jobs running at once |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::query::exact::{ExactMatchStyle, KEYWORD_PLACEHOLDER};
use crate::query::{NormalizeMode, QueryOptions};
use crate::reconcile::DedupPolicy;

pub const DEFAULT_SLACK_API: &str = "https://slack.com/api";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name}={value:?} is invalid: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Secret that never shows up in `Debug` output or logs.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: String,
    pub key: ApiKey,
}

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub host: String,
    pub app_id: ApiKey,
    pub app_key: ApiKey,
    pub days_behind: u32,
    pub per_page: u32,
    pub pause: Duration,
    pub dedup: DedupPolicy,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub token: ApiKey,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub semantic: Endpoint,
    pub core: Endpoint,
    pub patents: Option<Endpoint>,
    pub news: NewsConfig,
    pub paper_limit: u32,
    pub patent_limit: u32,
    pub query: QueryOptions,
    pub report_dir: PathBuf,
    pub slack: Option<SlackConfig>,
    pub max_concurrent_jobs: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        let patents = match (vars.optional("PATENT_URL"), vars.optional("PATENT_KEY")) {
            (Some(url), Some(key)) => Some(Endpoint {
                url: validate_url("PATENT_URL", url)?,
                key: ApiKey::new(key),
            }),
            _ => None,
        };

        let slack = vars.optional("SLACK_TOKEN").map(|token| SlackConfig {
            token: ApiKey::new(token),
            api_url: vars
                .optional("SLACK_API_URL")
                .unwrap_or_else(|| DEFAULT_SLACK_API.to_string()),
        });
        if let Some(ref s) = slack {
            validate_url("SLACK_API_URL", s.api_url.clone())?;
        }

        let dedup = match vars.optional("NEWS_DEDUP") {
            Some(v) => DedupPolicy::parse(&v).ok_or_else(|| ConfigError::Invalid {
                name: "NEWS_DEDUP",
                value: v,
                reason: "expected `exact` or `containment`".into(),
            })?,
            None => DedupPolicy::default(),
        };

        Ok(Self {
            semantic: vars.endpoint("SEMANTIC_URL", "SEMANTIC_KEY")?,
            core: vars.endpoint("CORE_URL", "CORE_KEY")?,
            patents,
            news: NewsConfig {
                host: validate_url("AYLIEN_HOST", vars.required("AYLIEN_HOST")?)?,
                app_id: ApiKey::new(vars.required("AYLIEN_APP_ID")?),
                app_key: ApiKey::new(vars.required("AYLIEN_APP_KEY")?),
                days_behind: vars.number("NEWS_DAYS_BEHIND", 90)?,
                per_page: vars.number("NEWS_PER_PAGE", 25)?,
                pause: Duration::from_millis(vars.number("NEWS_PAUSE_MS", 1000)?),
                dedup,
            },
            paper_limit: vars.number("PAPER_LIMIT", 100)?,
            patent_limit: vars.number("PATENT_LIMIT", 100)?,
            query: QueryOptions::from_lookup(&lookup)?,
            report_dir: vars
                .optional("REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("reports")),
            slack,
            max_concurrent_jobs: vars.number::<usize>("JOB_MAX_CONCURRENT", 2)?.max(1),
        })
    }
}

impl QueryOptions {
    /// Read only the translation settings, for commands that never call a backend.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|name: &str| env::var(name).ok())
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);

        let normalize = match vars.optional("QUERY_NORMALIZE") {
            Some(v) => NormalizeMode::parse(&v).ok_or_else(|| ConfigError::Invalid {
                name: "QUERY_NORMALIZE",
                value: v,
                reason: "expected `substring` or `token`".into(),
            })?,
            None => NormalizeMode::default(),
        };

        let style = vars.optional("EXACT_MATCH_STYLE");
        let exact = match style.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("fields") => ExactMatchStyle::FieldExpansion,
            None | Some("template") => match vars.optional("EXACT_MATCH_TEMPLATE") {
                Some(t) if !t.contains(KEYWORD_PLACEHOLDER) => {
                    return Err(ConfigError::Invalid {
                        name: "EXACT_MATCH_TEMPLATE",
                        value: t,
                        reason: format!("template must contain {KEYWORD_PLACEHOLDER}"),
                    });
                }
                Some(t) => ExactMatchStyle::Template(t),
                None => ExactMatchStyle::default(),
            },
            Some(_) => {
                return Err(ConfigError::Invalid {
                    name: "EXACT_MATCH_STYLE",
                    value: style.clone().unwrap_or_default(),
                    reason: "expected `template` or `fields`".into(),
                });
            }
        };

        Ok(Self { normalize, exact })
    }
}

struct Vars<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn number<T: std::str::FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
                value: v,
            }),
            None => Ok(default),
        }
    }

    fn endpoint(&self, url: &'static str, key: &'static str) -> Result<Endpoint, ConfigError> {
        Ok(Endpoint {
            url: validate_url(url, self.required(url)?)?,
            key: ApiKey::new(self.required(key)?),
        })
    }
}

fn validate_url(name: &'static str, value: String) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        name,
        value: value.clone(),
        reason,
    };
    let parsed = url::Url::parse(&value).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(value.trim_end_matches('/').to_string()),
        other => Err(invalid(format!("unsupported scheme `{other}`"))),
    }
}
