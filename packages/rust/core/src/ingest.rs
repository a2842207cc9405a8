//! Ingestion pass: pull new items for every configured feed, write raw
//! documents, then advance the feed's cursor.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};
use url::Url;

use feedmill_feeds::{CursorStore, FeedBatch, FeedSource, sanitize_filename};
use feedmill_shared::{FeedEntry, FeedmillError, Result, write_atomic};

use crate::progress::ProgressReporter;

/// Result for one feed.
#[derive(Debug)]
pub struct FeedOutcome {
    pub feed: String,
    /// Paths written, or why the feed was skipped.
    pub result: std::result::Result<Vec<PathBuf>, String>,
}

/// Run-level report of an ingestion pass.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub feeds: Vec<FeedOutcome>,
}

impl IngestReport {
    pub fn documents_written(&self) -> usize {
        self.feeds
            .iter()
            .filter_map(|f| f.result.as_ref().ok())
            .map(Vec::len)
            .sum()
    }

    pub fn failed_feeds(&self) -> usize {
        self.feeds.iter().filter(|f| f.result.is_err()).count()
    }
}

/// Ingest every feed in `feeds` into `raw_root`.
///
/// Feeds are independent: a failure is logged and recorded, its cursor is
/// left unchanged, and the next feed is processed. A feed's cursor only
/// moves after all of its documents are on disk.
#[instrument(skip_all, fields(feeds = feeds.len(), raw_root = %raw_root.display()))]
pub async fn ingest_feeds<S>(
    feeds: &[FeedEntry],
    source: &S,
    store: &mut CursorStore,
    raw_root: &Path,
    progress: &dyn ProgressReporter,
) -> IngestReport
where
    S: FeedSource + Sync,
{
    progress.phase("Fetching feeds");
    let mut report = IngestReport::default();

    for (i, entry) in feeds.iter().enumerate() {
        progress.item(i + 1, feeds.len(), entry.name.as_deref().unwrap_or(&entry.url));

        let result = ingest_feed(entry, source, store, raw_root).await;
        match &result {
            Ok(written) => info!(feed = %entry.url, documents = written.len(), "feed ingested"),
            Err(e) => warn!(feed = %entry.url, error = %e, "feed skipped"),
        }
        report.feeds.push(FeedOutcome {
            feed: entry.url.clone(),
            result: result.map_err(|e| e.to_string()),
        });
    }

    progress.finish(&format!(
        "{} documents from {} feeds ({} failed)",
        report.documents_written(),
        feeds.len(),
        report.failed_feeds()
    ));
    report
}

async fn ingest_feed<S>(
    entry: &FeedEntry,
    source: &S,
    store: &mut CursorStore,
    raw_root: &Path,
) -> Result<Vec<PathBuf>>
where
    S: FeedSource + Sync,
{
    let since = store.get(&entry.url);
    let batch = source.fetch_since(&entry.url, since).await?;

    let feed_dir = raw_root.join(format!("_{}", feed_dir_name(entry, &batch)));
    let written = write_batch(&batch, &feed_dir)?;

    if let Some(newest) = batch.newest {
        store.set(&entry.url, newest)?;
    }
    Ok(written)
}

fn write_batch(batch: &FeedBatch, feed_dir: &Path) -> Result<Vec<PathBuf>> {
    if batch.documents.is_empty() {
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(feed_dir).map_err(|e| FeedmillError::io(feed_dir, e))?;

    let mut written = Vec::with_capacity(batch.documents.len());
    for item in &batch.documents {
        let path = feed_dir.join(&item.document.path);
        write_atomic(&path, item.document.render().as_bytes())
            .map_err(|e| FeedmillError::io(&path, e))?;
        written.push(path);
    }
    Ok(written)
}

/// Configured name, else the feed's own title, else the feed host.
fn feed_dir_name(entry: &FeedEntry, batch: &FeedBatch) -> String {
    let name = entry
        .name
        .clone()
        .or_else(|| batch.feed_title.clone())
        .or_else(|| {
            Url::parse(&entry.url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
        })
        .unwrap_or_default();
    sanitize_filename(&name)
}
