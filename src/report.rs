//! One report end to end: translate, search, reconcile, publish, notify.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backends::{
    BackendError, CoreClient, NewsClient, PaperSearch, PatentClient, SemanticClient,
};
use crate::config::Config;
use crate::dataset::{self, Table};
use crate::news::collect_news;
use crate::notify::{self, NotifyError, SlackNotifier};
use crate::publish::{LocalPublisher, PublishError, PublishedDataset};
use crate::query::{QueryOptions, TranslatedQuery};
use crate::reconcile::{DedupPolicy, reconcile};
use crate::record::{RecordSet, ResultRecord, SourceId};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("every paper backend failed, first was {backend}: {error}")]
    AllPapersFailed {
        backend: SourceId,
        #[source]
        error: BackendError,
    },

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("failed to post report links: {0}")]
    Notify(#[from] NotifyError),

    #[error("report job panicked: {0}")]
    Panicked(String),
}

/// What the user asked for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportRequest {
    pub query: String,
    pub secondary: Vec<String>,
    pub share_with: Option<String>,
    pub channel: Option<String>,
}

impl ReportRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Trim secondary keywords and drop the empty ones, however the request arrived.
    pub fn normalized(mut self) -> Self {
        self.secondary = clean_keywords(self.secondary.iter().map(String::as_str));
        self
    }
}

/// Split a comma-separated keyword list, trimming entries and dropping empties.
pub fn parse_secondary(list: &str) -> Vec<String> {
    clean_keywords(list.split(','))
}

fn clean_keywords<'a>(keywords: impl Iterator<Item = &'a str>) -> Vec<String> {
    keywords
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Reconciled records for every report section, before publishing.
#[derive(Debug, Clone)]
pub struct Gathered {
    pub query: TranslatedQuery,
    pub research: Vec<ResultRecord>,
    pub patents: Option<Vec<ResultRecord>>,
    pub news: Vec<ResultRecord>,
}

impl Gathered {
    /// Research first, then news, then patents when that backend is configured.
    pub fn tables(&self) -> Vec<Table> {
        let mut tables = vec![
            dataset::research_table(&self.research),
            dataset::news_table(&self.news),
        ];
        if let Some(patents) = &self.patents {
            tables.push(dataset::patent_table(patents));
        }
        tables
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    pub query: TranslatedQuery,
    pub research: usize,
    pub patents: usize,
    pub news: usize,
    pub datasets: Vec<PublishedDataset>,
}

#[derive(Clone)]
pub struct Backends {
    pub semantic: SemanticClient,
    pub core: CoreClient,
    pub patents: Option<PatentClient>,
    pub news: NewsClient,
}

impl Backends {
    pub fn from_config(http: &Client, config: &Config) -> Self {
        Self {
            semantic: SemanticClient::new(http.clone(), &config.semantic, config.paper_limit),
            core: CoreClient::new(http.clone(), &config.core, config.paper_limit),
            patents: config
                .patents
                .as_ref()
                .map(|p| PatentClient::new(http.clone(), p, config.patent_limit)),
            news: NewsClient::new(http.clone(), &config.news),
        }
    }
}

#[derive(Clone)]
pub struct ReportService {
    backends: Backends,
    query: QueryOptions,
    news_pause: Duration,
    news_dedup: DedupPolicy,
    publisher: LocalPublisher,
    notifier: Option<SlackNotifier>,
}

impl ReportService {
    pub fn new(
        backends: Backends,
        query: QueryOptions,
        publisher: LocalPublisher,
        notifier: Option<SlackNotifier>,
    ) -> Self {
        Self {
            backends,
            query,
            news_pause: Duration::from_secs(1),
            news_dedup: DedupPolicy::default(),
            publisher,
            notifier,
        }
    }

    pub fn from_config(http: &Client, config: &Config) -> Self {
        let notifier = config
            .slack
            .as_ref()
            .map(|s| SlackNotifier::new(http.clone(), s));
        Self::new(
            Backends::from_config(http, config),
            config.query.clone(),
            LocalPublisher::new(&config.report_dir),
            notifier,
        )
        .with_news(config.news.pause, config.news.dedup)
    }

    pub fn with_news(mut self, pause: Duration, dedup: DedupPolicy) -> Self {
        self.news_pause = pause;
        self.news_dedup = dedup;
        self
    }

    /// Query every backend and reconcile each section.
    ///
    /// Backends run one after another. A failing backend contributes no
    /// records unless it leaves the research section with no working source.
    pub async fn gather(&self, request: &ReportRequest) -> Result<Gathered, ReportError> {
        let query = self.query.translate(&request.query);
        let secondary = clean_keywords(request.secondary.iter().map(String::as_str));
        info!(
            normalized = %query.normalized,
            plain = %query.plain,
            exact = %query.exact,
            keywords = ?query.keywords,
            "query translated"
        );

        let semantic = search(&self.backends.semantic, &query.plain).await;
        let core = search(&self.backends.core, &query.exact).await;
        let (semantic, core) = match (semantic, core) {
            (Err(error), Err(_)) => {
                return Err(ReportError::AllPapersFailed {
                    backend: SourceId::SemanticScholar,
                    error,
                });
            }
            pair => pair,
        };
        let research = reconcile(
            vec![
                RecordSet::from_outcome(SourceId::SemanticScholar, semantic),
                RecordSet::from_outcome(SourceId::Core, core),
            ],
            &secondary,
            DedupPolicy::ExactTitle,
        );

        let patents = match &self.backends.patents {
            Some(client) => {
                let outcome = client.search(&query.keywords).await;
                Some(reconcile(
                    vec![RecordSet::from_outcome(SourceId::Patents, outcome)],
                    &secondary,
                    DedupPolicy::ExactTitle,
                ))
            }
            None => None,
        };

        let stories = collect_news(&self.backends.news, &query.normalized, self.news_pause).await;
        let news = reconcile(vec![stories], &secondary, self.news_dedup);

        info!(
            research = research.len(),
            patents = patents.as_ref().map_or(0, Vec::len),
            news = news.len(),
            "report sections gathered"
        );
        Ok(Gathered {
            query,
            research,
            patents,
            news,
        })
    }

    /// Gather, publish, and post the dataset links to the request's channel.
    pub async fn run(&self, request: &ReportRequest) -> Result<ReportOutcome, ReportError> {
        let chat = self.notifier.as_ref().zip(request.channel.as_deref());

        if let Some((notifier, channel)) = chat
            && let Err(e) = notifier.post(&notify::processing_payload(channel)).await
        {
            warn!(channel, error = %e, "could not post processing notice");
        }

        let gathered = self.gather(request).await?;
        let datasets = self
            .publisher
            .publish(&request.query, &gathered.tables(), request.share_with.as_deref())
            .await?;

        if let Some((notifier, channel)) = chat {
            notifier
                .post(&notify::links_payload(channel, &datasets))
                .await?;
        }

        Ok(ReportOutcome {
            research: gathered.research.len(),
            patents: gathered.patents.as_ref().map_or(0, Vec::len),
            news: gathered.news.len(),
            query: gathered.query,
            datasets,
        })
    }

    pub fn notifier(&self) -> Option<&SlackNotifier> {
        self.notifier.as_ref()
    }
}

async fn search(
    backend: &impl PaperSearch,
    query: &str,
) -> Result<Vec<ResultRecord>, BackendError> {
    let source = backend.source();
    let outcome = backend.search(query).await;
    match &outcome {
        Ok(records) => info!(%source, records = records.len(), "paper search complete"),
        Err(e) => warn!(%source, error = %e, "paper search failed"),
    }
    outcome
}
