//! Pipeline orchestration for feedmill.
//!
//! Two passes, run separately or back to back:
//! - [`ingest_feeds`]: feeds → raw Markdown documents, cursor per feed
//! - [`run_batch`]: raw tree → translated, summarized documents in a mirrored
//!   destination tree, sources marked `[ds]` once published

pub mod batch;
pub mod generation;
pub mod ingest;
pub mod marker;
pub mod progress;
pub mod publisher;
pub mod transform;
pub mod walker;

pub use batch::{BatchConfig, BatchReport, DocumentOutcome, dated_dir, process_document, run_batch};
pub use generation::{ChatCompletionClient, CompletionClient};
pub use ingest::{FeedOutcome, IngestReport, ingest_feeds};
pub use marker::mark_done;
pub use progress::{ProgressReporter, SilentProgress};
pub use publisher::publish;
pub use transform::{Generated, TransformConfig, transform};
pub use walker::candidates;
