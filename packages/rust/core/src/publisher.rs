//! Publisher: mirror a transformed document into the destination tree.

use std::path::{Path, PathBuf};

use tracing::debug;

use feedmill_markdown::Document;
use feedmill_shared::{FeedmillError, Result, write_atomic};

/// Write `doc` to the path mirroring its location under `source_root`
/// inside `dest_root`, creating directories and overwriting silently.
///
/// The write goes through a temp file in the target directory, so a failure
/// never leaves a partial destination file.
pub fn publish(doc: &Document, source_root: &Path, dest_root: &Path) -> Result<PathBuf> {
    let relative = doc.path.strip_prefix(source_root).map_err(|_| {
        FeedmillError::publish(
            &doc.path,
            format!("not under source root {}", source_root.display()),
        )
    })?;
    if relative.as_os_str().is_empty() {
        return Err(FeedmillError::publish(&doc.path, "path is the source root itself"));
    }

    let dest = dest_root.join(relative);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            FeedmillError::publish(&dest, format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    write_atomic(&dest, doc.render().as_bytes())
        .map_err(|e| FeedmillError::publish(&dest, e.to_string()))?;

    debug!(dest = %dest.display(), "published");
    Ok(dest)
}
