//! Progress callbacks for long-running commands.

/// Receives progress from the ingestion and batch passes.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each item (feed or document) of the current phase.
    fn item(&self, current: usize, total: usize, detail: &str);
    /// Called when the current phase is finished.
    fn finish(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item(&self, _current: usize, _total: usize, _detail: &str) {}
    fn finish(&self, _summary: &str) {}
}
