//! Error types for feedmill.
//!
//! Library crates use [`FeedmillError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! The per-item variants (`Fetch`, `Generation`, `GenerationParse`, `Publish`,
//! `Mark`) are recoverable: the batch and ingestion loops log them, record them
//! in the run report, and move on to the next feed or document.

use std::path::PathBuf;

/// Top-level error type for all feedmill operations.
#[derive(Debug, thiserror::Error)]
pub enum FeedmillError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Document, feed, or date parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Cursor store read/write error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Network or parse failure while fetching one feed.
    #[error("fetch error for {feed}: {message}")]
    Fetch { feed: String, message: String },

    /// The generation service failed (timeout, transport, HTTP status).
    #[error("generation error: {0}")]
    Generation(String),

    /// The generation service answered, but a required segment was missing or empty.
    #[error("generation response incomplete: missing {segment}")]
    GenerationParse { segment: String },

    /// Writing the transformed document into the destination tree failed.
    #[error("publish error at {path:?}: {message}")]
    Publish { path: PathBuf, message: String },

    /// Renaming the processed source failed after a successful publish.
    #[error("mark error at {path:?}: {source}")]
    Mark {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FeedmillError>;

impl FeedmillError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a fetch error for a single feed.
    pub fn fetch(feed: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            feed: feed.into(),
            message: msg.into(),
        }
    }

    /// Create a publish error for a destination path.
    pub fn publish(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Publish {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Name of the response segment that was missing.
    pub fn missing_segment(segment: impl Into<String>) -> Self {
        Self::GenerationParse {
            segment: segment.into(),
        }
    }
}
