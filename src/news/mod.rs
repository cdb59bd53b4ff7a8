//! Category-bucketed news collection.

pub mod buckets;

use std::time::Duration;

use tracing::{info, warn};

use crate::backends::NewsSearch;
use crate::record::{RecordSet, SourceId};

pub use buckets::buckets_excluding_catch_all;

/// Query every non-catch-all bucket in turn and collect the stories.
///
/// Buckets run sequentially with `pause` between queries. A failing bucket
/// is logged and contributes nothing; the remaining buckets still run.
/// Stories are not deduplicated here.
pub async fn collect_news(client: &impl NewsSearch, text: &str, pause: Duration) -> RecordSet {
    let mut records = Vec::new();

    for (i, bucket) in buckets_excluding_catch_all().into_iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        match client.list_stories(text, &bucket.aql()).await {
            Ok(stories) => {
                info!(bucket = bucket.name, stories = stories.len(), "news bucket fetched");
                records.extend(stories.into_iter().map(|s| s.into_record(bucket.name)));
            }
            Err(e) => warn!(bucket = bucket.name, error = %e, "news bucket failed, skipping"),
        }
    }

    RecordSet::new(SourceId::News, records)
}
