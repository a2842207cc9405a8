//! Batch pass: walk → transform → publish → mark, one document at a time.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use path_absolutize::Absolutize;
use tracing::{info, instrument, warn};

use feedmill_markdown::Document;
use feedmill_shared::{FeedmillError, Result};

use crate::generation::CompletionClient;
use crate::marker::mark_done;
use crate::progress::ProgressReporter;
use crate::publisher::publish;
use crate::transform::{TransformConfig, transform};
use crate::walker::candidates;

/// Inputs of one batch pass.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub transform: TransformConfig,
}

impl BatchConfig {
    /// The destination must not overlap the source tree, or published
    /// documents would become candidates themselves. Roots are compared as
    /// absolute paths with `.` and `..` resolved.
    pub fn validate(&self) -> Result<()> {
        let source = absolute(&self.source_root)?;
        let dest = absolute(&self.dest_root)?;
        if dest.starts_with(&source) || source.starts_with(&dest) {
            return Err(FeedmillError::validation(format!(
                "source root {} and destination root {} overlap",
                self.source_root.display(),
                self.dest_root.display()
            )));
        }
        Ok(())
    }
}

/// What happened to one candidate.
#[derive(Debug)]
pub enum DocumentOutcome {
    /// Published and marked.
    Done { dest: PathBuf, marked: PathBuf },
    /// Published, but the source could not be marked. It is picked up
    /// again (and re-published) on the next run.
    Partial { dest: PathBuf, error: FeedmillError },
    /// Nothing written; the source stays unmarked.
    Failed(FeedmillError),
}

/// Run-level report of a batch pass.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    pub partial: Vec<(PathBuf, String)>,
    pub elapsed: Duration,
}

impl BatchReport {
    /// `true` if every candidate was published and marked.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.partial.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents: {} succeeded, {} failed, {} partial",
            self.total,
            self.succeeded.len(),
            self.failed.len(),
            self.partial.len()
        )
    }
}

/// Process every pending document under `config.source_root`.
///
/// Per-document errors are recorded in the report; none of them stops the
/// pass.
#[instrument(skip_all, fields(src = %config.source_root.display(), dst = %config.dest_root.display()))]
pub async fn run_batch<C>(
    config: &BatchConfig,
    client: &C,
    progress: &dyn ProgressReporter,
) -> BatchReport
where
    C: CompletionClient + Sync,
{
    let start = Instant::now();
    progress.phase("Translating documents");

    let pending: Vec<PathBuf> = candidates(&config.source_root).collect();
    let mut report = BatchReport {
        total: pending.len(),
        ..Default::default()
    };
    info!(candidates = report.total, "batch pass started");

    for (i, path) in pending.into_iter().enumerate() {
        progress.item(i + 1, report.total, &display_name(&path, &config.source_root));

        match process_document(&path, config, client).await {
            DocumentOutcome::Done { dest, marked } => {
                info!(source = %path.display(), dest = %dest.display(), marked = %marked.display(), "document done");
                report.succeeded.push(path);
            }
            DocumentOutcome::Partial { dest, error } => {
                warn!(source = %path.display(), dest = %dest.display(), %error, "published but not marked");
                report.partial.push((path, error.to_string()));
            }
            DocumentOutcome::Failed(error) => {
                warn!(source = %path.display(), %error, "document failed");
                report.failed.push((path, error.to_string()));
            }
        }
    }

    report.elapsed = start.elapsed();
    info!(
        total = report.total,
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        partial = report.partial.len(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "batch pass complete"
    );
    progress.finish(&report.to_string());
    report
}

/// Transform, publish, then mark one document. Marking only happens after a
/// successful publish.
pub async fn process_document<C>(path: &Path, config: &BatchConfig, client: &C) -> DocumentOutcome
where
    C: CompletionClient + Sync,
{
    let published = async {
        let doc = Document::read(path)?;
        let transformed = transform(client, &doc, &config.transform).await?;
        publish(&transformed, &config.source_root, &config.dest_root)
    };

    let dest = match published.await {
        Ok(dest) => dest,
        Err(e) => return DocumentOutcome::Failed(e),
    };

    match mark_done(path) {
        Ok(marked) => DocumentOutcome::Done { dest, marked },
        Err(error) => DocumentOutcome::Partial { dest, error },
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    path.absolutize()
        .map(|p| p.into_owned())
        .map_err(|e| FeedmillError::io(path, e))
}

fn display_name(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Resolve `<base>/<prefix>_<YYYY-MM-DD>` for today's default directories.
pub fn dated_dir(base: &Path, prefix: &str) -> PathBuf {
    base.join(format!(
        "{prefix}_{}",
        chrono::Local::now().date_naive().format("%Y-%m-%d")
    ))
}
