//! Wire types for the backend responses.
//!
//! Decoding degrades field by field: a field with an unexpected shape reads
//! as absent, and list entries that fail to decode are skipped, so one odd
//! record never costs the rest of the response.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::record::{NewsDetails, PatentDetails, ResultRecord, SourceDetails, SourceId};

/// Decode a field, falling back to its default when the value has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Decode a list, skipping entries that are `null` or malformed.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter(|item| !item.is_null())
        .filter_map(|item| T::deserialize(item).ok())
        .collect())
}

#[derive(Debug, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

fn author_names(authors: Vec<Author>) -> Vec<String> {
    authors.into_iter().filter_map(|a| a.name).collect()
}

/// Response from the structured-research paper search.
#[derive(Debug, Deserialize)]
pub struct SemanticResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub data: Vec<SemanticPaper>,
}

#[derive(Debug, Deserialize)]
pub struct SemanticPaper {
    pub url: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub authors: Vec<Author>,
}

impl From<SemanticPaper> for ResultRecord {
    fn from(paper: SemanticPaper) -> Self {
        let mut record = ResultRecord::new(SourceId::SemanticScholar, paper.title);
        record.abstract_text = paper.abstract_text;
        record.url = paper.url;
        record.year = paper.year;
        record.authors = author_names(paper.authors);
        record
    }
}

/// Response from the open-access aggregator's work search.
#[derive(Debug, Deserialize)]
pub struct CoreResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub results: Vec<CoreWork>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreWork {
    pub download_url: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub year_published: Option<i32>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub authors: Vec<Author>,
}

impl From<CoreWork> for ResultRecord {
    fn from(work: CoreWork) -> Self {
        let mut record = ResultRecord::new(SourceId::Core, work.title);
        record.abstract_text = work.abstract_text;
        record.url = work.download_url;
        record.year = work.year_published;
        record.authors = author_names(work.authors);
        record
    }
}

/// Body of a patent search request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatentQuery<'a> {
    pub primary_keywords: &'a [String],
    pub size: u32,
    pub from: u32,
}

#[derive(Debug, Deserialize)]
pub struct PatentResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub results: Vec<PatentRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatentRecord {
    pub country: Option<String>,
    pub patent_number: Option<String>,
    pub publication_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub inventors: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub assignees: Vec<String>,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub document_type: Option<String>,
    pub category: Option<String>,
    pub classification: Option<String>,
    pub url: Option<String>,
}

impl From<PatentRecord> for ResultRecord {
    fn from(patent: PatentRecord) -> Self {
        let mut record = ResultRecord::new(SourceId::Patents, patent.title);
        record.abstract_text = patent.abstract_text;
        record.url = patent.url;
        record.year = patent
            .publication_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok());
        record.publication_date = patent.publication_date;
        record.authors = patent.inventors.clone();
        record.details = SourceDetails::Patent(PatentDetails {
            country: patent.country,
            patent_number: patent.patent_number,
            document_type: patent.document_type,
            category: patent.category,
            classification: patent.classification,
            inventors: patent.inventors,
            assignees: patent.assignees,
        });
        record
    }
}

/// Response from the news backend's story listing.
#[derive(Debug, Deserialize)]
pub struct StoriesResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub stories: Vec<Story>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Story {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub source: Option<StorySource>,
    #[serde(default, deserialize_with = "lenient")]
    pub links: Option<StoryLinks>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorySource {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub locations: Vec<StoryLocation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoryLocation {
    #[serde(default, deserialize_with = "lenient")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoryLinks {
    pub permalink: Option<String>,
}

impl Story {
    /// Project into a record filed under the bucket the story was found in.
    pub fn into_record(self, category: &str) -> ResultRecord {
        let (source_name, country) = match self.source {
            Some(s) => (
                s.name,
                s.locations.into_iter().next().and_then(|l| l.country),
            ),
            None => (None, None),
        };
        let mut record = ResultRecord::new(SourceId::News, self.title);
        record.url = self.links.and_then(|l| l.permalink);
        record.details = SourceDetails::News(NewsDetails {
            category: category.to_string(),
            source_name,
            country,
        });
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_paper_tolerates_missing_fields() {
        let paper: SemanticPaper =
            serde_json::from_value(serde_json::json!({"paperId": "p1", "title": "T"})).unwrap();
        let record = ResultRecord::from(paper);
        assert_eq!(record.title.as_deref(), Some("T"));
        assert!(record.authors.is_empty());
        assert!(record.abstract_text.is_none());
    }

    #[test]
    fn core_work_renames_download_url_and_year() {
        let work: CoreWork = serde_json::from_value(serde_json::json!({
            "downloadUrl": "https://core.example/download/1.pdf",
            "title": "Grid storage",
            "abstract": null,
            "yearPublished": 2021,
            "authors": [{"name": "Ada"}, {"name": null}, {"name": "Grace"}]
        }))
        .unwrap();
        let record = ResultRecord::from(work);
        assert_eq!(record.url.as_deref(), Some("https://core.example/download/1.pdf"));
        assert_eq!(record.year, Some(2021));
        assert_eq!(record.authors, vec!["Ada", "Grace"]);
        assert_eq!(record.source, SourceId::Core);
    }

    #[test]
    fn patent_record_keeps_patent_fields() {
        let patent: PatentRecord = serde_json::from_value(serde_json::json!({
            "country": "US",
            "patentNumber": "US1234567B2",
            "publicationDate": "2022-03-01",
            "inventors": ["Ada"],
            "title": "Battery cell",
            "classification": "H01M"
        }))
        .unwrap();
        let record = ResultRecord::from(patent);
        assert_eq!(record.year, Some(2022));
        assert_eq!(record.publication_date.as_deref(), Some("2022-03-01"));
        assert_eq!(record.authors, vec!["Ada"]);
        match record.details {
            SourceDetails::Patent(d) => {
                assert_eq!(d.patent_number.as_deref(), Some("US1234567B2"));
                assert_eq!(d.classification.as_deref(), Some("H01M"));
                assert!(d.assignees.is_empty());
            }
            other => panic!("expected patent details, got: {other:?}"),
        }
    }

    #[test]
    fn story_uses_first_location_country() {
        let story: Story = serde_json::from_value(serde_json::json!({
            "title": "Acme raises $10M",
            "source": {"name": "Wire", "locations": [{"country": "US"}, {"country": "GB"}]},
            "links": {"permalink": "https://news.example/acme"}
        }))
        .unwrap();
        let record = story.into_record("Funding");
        assert_eq!(record.url.as_deref(), Some("https://news.example/acme"));
        assert_eq!(
            record.details,
            SourceDetails::News(NewsDetails {
                category: "Funding".into(),
                source_name: Some("Wire".into()),
                country: Some("US".into()),
            })
        );
    }

    #[test]
    fn story_without_locations_has_no_country() {
        let story: Story = serde_json::from_value(serde_json::json!({
            "title": "Quiet story",
            "source": {"name": "Wire"}
        }))
        .unwrap();
        match story.into_record("IPO").details {
            SourceDetails::News(d) => assert!(d.country.is_none()),
            other => panic!("expected news details, got: {other:?}"),
        }
    }

    #[test]
    fn null_locations_do_not_sink_the_listing() {
        let response: StoriesResponse = serde_json::from_value(serde_json::json!({
            "stories": [
                {"title": "Acme IPO", "source": {"name": "Wire", "locations": [{"country": "US"}]}},
                {"title": "Quiet story", "source": {"name": "Desk", "locations": null}},
                null
            ]
        }))
        .unwrap();
        assert_eq!(response.stories.len(), 2);

        match response.stories[1].clone().into_record("IPO").details {
            SourceDetails::News(d) => {
                assert_eq!(d.source_name.as_deref(), Some("Desk"));
                assert!(d.country.is_none());
            }
            other => panic!("expected news details, got: {other:?}"),
        }
    }

    #[test]
    fn null_author_entries_keep_the_paper() {
        let response: SemanticResponse = serde_json::from_value(serde_json::json!({
            "data": [
                {"title": "Grid", "authors": [null, {"name": "Ada"}]},
                {"title": "Cells", "authors": null, "year": "2020"}
            ]
        }))
        .unwrap();
        assert_eq!(response.data.len(), 2);

        let records: Vec<ResultRecord> = response.data.into_iter().map(ResultRecord::from).collect();
        assert_eq!(records[0].authors, vec!["Ada"]);
        assert!(records[1].authors.is_empty());
        assert!(records[1].year.is_none());
    }

    #[test]
    fn malformed_patent_lists_read_as_empty() {
        let response: PatentResponse = serde_json::from_value(serde_json::json!({
            "results": [{"title": "Cell", "inventors": "Ada", "assignees": [null, "Acme"]}]
        }))
        .unwrap();
        let record = ResultRecord::from(response.results.into_iter().next().unwrap());
        assert!(record.authors.is_empty());
        match record.details {
            SourceDetails::Patent(d) => assert_eq!(d.assignees, vec!["Acme"]),
            other => panic!("expected patent details, got: {other:?}"),
        }
    }
}
