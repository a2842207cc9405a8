//! Shared types, error model, and configuration for feedmill.
//!
//! This crate is the foundation depended on by all other feedmill crates.
//! It provides:
//! - [`FeedmillError`]: the unified error type
//! - Domain types ([`FeedCursor`], [`DocumentStatus`], the completion mark)
//! - Configuration ([`AppConfig`], [`GenerationConfig`], config loading)
//! - Crash-safe file writes ([`write_atomic`])

pub mod config;
pub mod error;
pub mod fs;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FeedEntry, FetchConfig, GenerationConfig, PathsConfig, config_dir,
    config_file_path, init_config, init_config_at, load_config, load_config_from,
    validate_api_key,
};
pub use error::{FeedmillError, Result};
pub use fs::write_atomic;
pub use types::{COMPLETION_MARK, DocumentStatus, FeedCursor, parse_timestamp};
