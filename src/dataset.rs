//! Tabular views of reconciled records, one per report section.

use serde::Serialize;

use crate::record::{ResultRecord, SourceDetails};

/// Placeholder for a story whose outlet has no known country.
const NO_COUNTRY: &str = "DNE";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn new(name: &str, columns: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

pub fn research_table(records: &[ResultRecord]) -> Table {
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.index.to_string(),
                text(&r.title),
                text(&r.url),
                r.year.map(|y| y.to_string()).unwrap_or_default(),
                r.authors.join(", "),
                text(&r.abstract_text),
                r.source.to_string(),
                r.secondary.join(", "),
            ]
        })
        .collect();
    Table::new(
        "research",
        &["index", "title", "url", "year", "authors", "abstract", "source", "secondary"],
        rows,
    )
}

pub fn patent_table(records: &[ResultRecord]) -> Table {
    let rows = records
        .iter()
        .map(|r| {
            let d = match &r.details {
                SourceDetails::Patent(d) => d.clone(),
                _ => Default::default(),
            };
            vec![
                r.index.to_string(),
                text(&d.country),
                text(&d.patent_number),
                text(&r.publication_date),
                d.inventors.join(", "),
                d.assignees.join(", "),
                text(&r.title),
                text(&r.abstract_text),
                text(&d.document_type),
                text(&d.category),
                text(&d.classification),
                r.secondary.join(", "),
            ]
        })
        .collect();
    Table::new(
        "patents",
        &[
            "index",
            "country",
            "patent_number",
            "publication_date",
            "inventors",
            "assignees",
            "title",
            "abstract",
            "document_type",
            "category",
            "classification",
            "secondary",
        ],
        rows,
    )
}

pub fn news_table(records: &[ResultRecord]) -> Table {
    let rows = records
        .iter()
        .map(|r| {
            let d = match &r.details {
                SourceDetails::News(d) => d.clone(),
                _ => Default::default(),
            };
            vec![
                d.category,
                text(&r.title),
                text(&d.source_name),
                d.country.unwrap_or_else(|| NO_COUNTRY.to_string()),
                text(&r.url),
            ]
        })
        .collect();
    Table::new("news", &["category", "title", "source", "country", "links"], rows)
}
