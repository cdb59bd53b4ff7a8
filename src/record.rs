use std::fmt;

use serde::Serialize;
use tracing::warn;

/// Backend a record was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    SemanticScholar,
    Core,
    Patents,
    News,
}

impl SourceId {
    pub fn label(self) -> &'static str {
        match self {
            SourceId::SemanticScholar => "semantic scholar",
            SourceId::Core => "core",
            SourceId::Patents => "patents",
            SourceId::News => "news",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewsDetails {
    /// Bucket the story was found under.
    pub category: String,
    pub source_name: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatentDetails {
    pub country: Option<String>,
    pub patent_number: Option<String>,
    pub document_type: Option<String>,
    pub category: Option<String>,
    pub classification: Option<String>,
    pub inventors: Vec<String>,
    pub assignees: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDetails {
    #[default]
    Paper,
    News(NewsDetails),
    Patent(PatentDetails),
}

/// One research paper, patent or news story in the common report shape.
///
/// Optional fields stay `None` when the backend omitted them; `authors` is
/// empty rather than absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub index: usize,
    pub source: SourceId,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub url: Option<String>,
    pub year: Option<i32>,
    pub publication_date: Option<String>,
    pub authors: Vec<String>,
    /// Secondary keywords found in the title or abstract.
    pub secondary: Vec<String>,
    pub details: SourceDetails,
}

impl ResultRecord {
    pub fn new(source: SourceId, title: Option<String>) -> Self {
        Self {
            index: 0,
            source,
            title,
            abstract_text: None,
            url: None,
            year: None,
            publication_date: None,
            authors: Vec::new(),
            secondary: Vec::new(),
            details: SourceDetails::default(),
        }
    }
}

/// Records returned by one backend, in the backend's own relevance order.
#[derive(Debug, Clone)]
pub struct RecordSet {
    pub source: SourceId,
    pub records: Vec<ResultRecord>,
}

impl RecordSet {
    pub fn new(source: SourceId, records: Vec<ResultRecord>) -> Self {
        Self { source, records }
    }

    pub fn empty(source: SourceId) -> Self {
        Self::new(source, Vec::new())
    }

    /// Keep a backend's records, or log its failure and contribute nothing.
    pub fn from_outcome<E: fmt::Display>(
        source: SourceId,
        outcome: Result<Vec<ResultRecord>, E>,
    ) -> Self {
        match outcome {
            Ok(records) => Self::new(source, records),
            Err(e) => {
                warn!(%source, error = %e, "backend failed, continuing without its results");
                Self::empty(source)
            }
        }
    }
}
