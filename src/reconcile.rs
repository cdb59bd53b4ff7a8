//! Merge per-backend record sets into one deduplicated, keyword-tagged table.

use std::collections::HashSet;

use tracing::debug;

use crate::record::{RecordSet, ResultRecord};

/// How two titles are judged to be the same item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Identical title text, case-sensitive. Missing titles form one group.
    #[default]
    ExactTitle,
    /// Identical title, or either non-empty title contains the other.
    TitleContainment,
}

impl DedupPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exact" => Some(Self::ExactTitle),
            "containment" => Some(Self::TitleContainment),
            _ => None,
        }
    }
}

/// Concatenate `sets` in order, drop later duplicate titles, tag each
/// survivor with the secondary keywords it mentions, and renumber.
pub fn reconcile(
    sets: Vec<RecordSet>,
    secondary: &[String],
    policy: DedupPolicy,
) -> Vec<ResultRecord> {
    let incoming: usize = sets.iter().map(|s| s.records.len()).sum();
    let mut seen = TitleIndex::new(policy);
    let mut merged = Vec::with_capacity(incoming);

    for set in sets {
        debug!(source = %set.source, records = set.records.len(), "merging record set");
        for mut record in set.records {
            if !seen.insert(record.title.as_deref()) {
                continue;
            }
            record.secondary = secondary_tags(&record, secondary);
            record.index = merged.len();
            merged.push(record);
        }
    }

    debug!(incoming, kept = merged.len(), ?policy, "records reconciled");
    merged
}

/// Lowercased keywords found in the record's title or abstract, in the
/// configured order.
pub fn secondary_tags(record: &ResultRecord, keywords: &[String]) -> Vec<String> {
    let title = record.title.as_deref().unwrap_or_default().to_lowercase();
    let abstract_text = record
        .abstract_text
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| title.contains(k.as_str()) || abstract_text.contains(k.as_str()))
        .collect()
}

struct TitleIndex {
    policy: DedupPolicy,
    exact: HashSet<Option<String>>,
    accepted: Vec<String>,
}

impl TitleIndex {
    fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            exact: HashSet::new(),
            accepted: Vec::new(),
        }
    }

    /// Returns `false` if `title` duplicates one already accepted.
    fn insert(&mut self, title: Option<&str>) -> bool {
        if self.exact.contains(&title.map(str::to_string)) {
            return false;
        }
        if self.policy == DedupPolicy::TitleContainment
            && let Some(t) = title
        {
            // An empty title is contained in every accepted one.
            let duplicate = if t.is_empty() {
                !self.accepted.is_empty()
            } else {
                self.accepted
                    .iter()
                    .any(|prev| prev.contains(t) || t.contains(prev.as_str()))
            };
            if duplicate {
                return false;
            }
        }
        if let Some(t) = title.filter(|t| !t.is_empty()) {
            self.accepted.push(t.to_string());
        }
        self.exact.insert(title.map(str::to_string));
        true
    }
}
