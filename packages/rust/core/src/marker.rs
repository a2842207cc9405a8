//! Completion marker: rename a processed source to `[ds]<name>`.

use std::path::{Path, PathBuf};

use tracing::debug;

use feedmill_shared::{COMPLETION_MARK, DocumentStatus, FeedmillError, Result};

/// Path a source file takes once marked done.
pub fn marked_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    Some(path.with_file_name(format!("{COMPLETION_MARK}{name}")))
}

/// Rename `path` in place to carry the completion mark and return the new
/// path. Content is untouched; a stale marked file of the same name is
/// replaced. Already-marked paths are returned as they are.
pub fn mark_done(path: &Path) -> Result<PathBuf> {
    if DocumentStatus::of(path) == DocumentStatus::Done {
        return Ok(path.to_path_buf());
    }

    let target = marked_path(path).ok_or_else(|| FeedmillError::Mark {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "file name is missing or not valid UTF-8",
        ),
    })?;

    std::fs::rename(path, &target).map_err(|source| FeedmillError::Mark {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(from = %path.display(), to = %target.display(), "marked done");
    Ok(target)
}
