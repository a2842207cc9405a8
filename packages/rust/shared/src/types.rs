//! Core domain types for feedmill.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filename prefix marking a source document as transformed and published.
pub const COMPLETION_MARK: &str = "[ds]";

// ---------------------------------------------------------------------------
// FeedCursor
// ---------------------------------------------------------------------------

/// Per-feed watermark: the publish time of the newest ingested item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCursor {
    /// Feed source identifier (the feed URL).
    pub feed: String,
    /// Newest item timestamp seen on a successful fetch.
    pub last_seen: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// DocumentStatus
// ---------------------------------------------------------------------------

/// Processing state of a source document, encoded in its filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    /// Not yet transformed; a candidate for the next batch pass.
    Pending,
    /// Carries the completion mark; never selected again.
    Done,
}

impl DocumentStatus {
    /// Derive the status from a path's file name (exact prefix match).
    pub fn of(path: &Path) -> Self {
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.starts_with(COMPLETION_MARK) => Self::Done,
            _ => Self::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parse a feed or front-matter timestamp.
///
/// Accepts RFC 2822 (RSS `pubDate`), RFC 3339 (Atom, ISO 8601 with offset or
/// `Z`), and the naive forms `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DD`, read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
