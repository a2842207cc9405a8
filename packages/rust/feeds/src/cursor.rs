//! Per-feed fetch cursors persisted as a flat JSON record.
//!
//! The record maps feed URL → RFC 3339 timestamp of the newest ingested item:
//!
//! ```json
//! { "https://export.arxiv.org/rss/cs.AI": "2025-06-11T08:00:00Z" }
//! ```
//!
//! Every [`CursorStore::set`] rewrites the whole record through a temp file
//! and rename, so a crash leaves either the old or the new record on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use feedmill_shared::{FeedCursor, FeedmillError, Result, write_atomic};

/// Durable feed URL → last-seen timestamp map.
#[derive(Debug)]
pub struct CursorStore {
    path: PathBuf,
    cursors: BTreeMap<String, DateTime<Utc>>,
}

impl CursorStore {
    /// Open the record at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let cursors = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                FeedmillError::Storage(format!("invalid cursor file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no cursor file yet");
                BTreeMap::new()
            }
            Err(e) => return Err(FeedmillError::io(&path, e)),
        };

        Ok(Self { path, cursors })
    }

    /// Location of the backing record.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last-seen timestamp for `feed`, if it was ever fetched successfully.
    pub fn get(&self, feed: &str) -> Option<DateTime<Utc>> {
        self.cursors.get(feed).copied()
    }

    /// Advance the cursor for `feed` and persist the record.
    ///
    /// A timestamp at or before the stored one is ignored. Returns whether
    /// the cursor moved. In-memory state only changes once the write
    /// has succeeded.
    pub fn set(&mut self, feed: &str, timestamp: DateTime<Utc>) -> Result<bool> {
        if self.get(feed).is_some_and(|current| timestamp <= current) {
            return Ok(false);
        }

        let mut next = self.cursors.clone();
        next.insert(feed.to_string(), timestamp);
        self.persist(&next)?;
        self.cursors = next;

        info!(feed, %timestamp, "cursor advanced");
        Ok(true)
    }

    /// Snapshot of all cursors, ordered by feed URL.
    pub fn cursors(&self) -> Vec<FeedCursor> {
        self.cursors
            .iter()
            .map(|(feed, last_seen)| FeedCursor {
                feed: feed.clone(),
                last_seen: *last_seen,
            })
            .collect()
    }

    fn persist(&self, cursors: &BTreeMap<String, DateTime<Utc>>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FeedmillError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(cursors)
            .map_err(|e| FeedmillError::Storage(format!("cursor serialization failed: {e}")))?;

        write_atomic(&self.path, json.as_bytes()).map_err(|e| FeedmillError::io(&self.path, e))
    }
}
