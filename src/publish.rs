//! Writes report datasets into one dated, query-named folder.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dataset::Table;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b$")
        .expect("email pattern is valid")
});

const SHARE_FILE: &str = "share.json";
const SHARE_ROLE: &str = "writer";
/// Longest query part of a folder name, in bytes; most filesystems cap a name at 255.
const MAX_QUERY_BYTES: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to write {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to encode dataset: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A dataset written by the publisher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedDataset {
    pub name: String,
    pub id: Uuid,
    pub link: String,
}

#[derive(Serialize)]
struct DatasetFile<'a> {
    id: Uuid,
    #[serde(flatten)]
    table: &'a Table,
}

#[derive(Serialize)]
struct ShareGrant<'a> {
    email: &'a str,
    role: &'static str,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// `<YYYY-MM-DD> | <query>`, with path separators and control characters
/// replaced and the query cut to [`MAX_QUERY_BYTES`] on a char boundary.
pub fn folder_name(date: NaiveDate, query: &str) -> String {
    let query: String = query
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let query = query.trim();
    let mut end = query.len().min(MAX_QUERY_BYTES);
    while !query.is_char_boundary(end) {
        end -= 1;
    }
    format!("{} | {}", date.format("%Y-%m-%d"), query[..end].trim_end())
}

/// Publishes datasets to the local filesystem under a report root.
#[derive(Debug, Clone)]
pub struct LocalPublisher {
    root: PathBuf,
}

impl LocalPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write every table and the optional share grant; returns one entry per
    /// table in call order.
    pub async fn publish(
        &self,
        query: &str,
        tables: &[Table],
        share_with: Option<&str>,
    ) -> Result<Vec<PublishedDataset>, PublishError> {
        let folder = self
            .root
            .join(folder_name(Local::now().date_naive(), query));
        create_dir(&folder).await?;

        let mut published = Vec::with_capacity(tables.len());
        for table in tables {
            let id = Uuid::new_v4();
            let path = folder.join(format!("{}.json", table.name));
            let body = serde_json::to_vec_pretty(&DatasetFile { id, table })?;
            write(&path, body).await?;
            info!(dataset = %table.name, rows = table.rows.len(), "dataset published");
            published.push(PublishedDataset {
                name: table.name.clone(),
                id,
                link: path.display().to_string(),
            });
        }

        match share_with {
            Some(email) if is_valid_email(email) => {
                let grant = ShareGrant {
                    email,
                    role: SHARE_ROLE,
                };
                write(&folder.join(SHARE_FILE), serde_json::to_vec_pretty(&grant)?).await?;
                info!(folder = %folder.display(), "report folder shared");
            }
            Some(email) => warn!(email, "share email is invalid, not sharing"),
            None => {}
        }

        Ok(published)
    }
}

async fn create_dir(path: &Path) -> Result<(), PublishError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| PublishError::Io {
            path: path.to_path_buf(),
            source,
        })
}

async fn write(path: &Path, body: Vec<u8>) -> Result<(), PublishError> {
    tokio::fs::write(path, body)
        .await
        .map_err(|source| PublishError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> Table {
        Table {
            name: name.to_string(),
            columns: vec!["title".into()],
            rows: vec![vec!["Grid".into()]],
        }
    }

    #[test]
    fn email_check_matches_whole_address() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("not an email"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("say ada@example.com please"));
    }

    #[test]
    fn folder_name_is_dated_and_path_safe() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(folder_name(date, "solar AND battery"), "2024-03-09 | solar AND battery");
        assert_eq!(folder_name(date, "a/b\\c\n"), "2024-03-09 | a-b-c");
    }

    #[test]
    fn long_query_is_cut_on_a_char_boundary() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let query = "é".repeat(150);
        let name = folder_name(date, &query);
        let kept = name.strip_prefix("2024-03-09 | ").unwrap();
        assert_eq!(kept.len(), MAX_QUERY_BYTES);
        assert!(kept.chars().all(|c| c == 'é'));

        let odd = format!("x{query}");
        let kept = folder_name(date, &odd).len() - "2024-03-09 | ".len();
        assert_eq!(kept, MAX_QUERY_BYTES - 1);
    }

    #[tokio::test]
    async fn publishes_under_a_very_long_query() {
        let dir = tempfile::tempdir().unwrap();
        let query = "(solar OR photovoltaic) AND (battery OR storage) AND ".repeat(12);
        assert!(query.len() > 600);

        let published = LocalPublisher::new(dir.path())
            .publish(&query, &[table("research")], None)
            .await
            .unwrap();

        let folder = Path::new(&published[0].link).parent().unwrap();
        assert!(folder.file_name().unwrap().len() <= 255);
        assert!(Path::new(&published[0].link).exists());
    }

    #[tokio::test]
    async fn writes_one_file_per_table_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = LocalPublisher::new(dir.path());

        let published = publisher
            .publish("solar", &[table("research"), table("news")], None)
            .await
            .unwrap();

        let names: Vec<_> = published.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["research", "news"]);
        assert_ne!(published[0].id, published[1].id);

        let written = tokio::fs::read(&published[0].link).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(json["name"], "research");
        assert_eq!(json["rows"][0][0], "Grid");
        assert_eq!(json["id"], published[0].id.to_string());

        let folder = Path::new(&published[0].link).parent().unwrap();
        assert!(folder.file_name().unwrap().to_string_lossy().ends_with("| solar"));
        assert!(!folder.join(SHARE_FILE).exists());
    }

    #[tokio::test]
    async fn valid_share_email_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let published = LocalPublisher::new(dir.path())
            .publish("solar", &[table("research")], Some("ada@example.com"))
            .await
            .unwrap();

        let folder = Path::new(&published[0].link).parent().unwrap();
        let grant: serde_json::Value =
            serde_json::from_slice(&std::fs::read(folder.join(SHARE_FILE)).unwrap()).unwrap();
        assert_eq!(grant["email"], "ada@example.com");
        assert_eq!(grant["role"], "writer");
    }

    #[tokio::test]
    async fn invalid_share_email_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let published = LocalPublisher::new(dir.path())
            .publish("solar", &[table("research")], Some("nobody"))
            .await
            .unwrap();

        let folder = Path::new(&published[0].link).parent().unwrap();
        assert!(!folder.join(SHARE_FILE).exists());
    }
}
