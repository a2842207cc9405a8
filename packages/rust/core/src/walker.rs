//! Content tree walker: pending Markdown documents under a source root.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use feedmill_shared::DocumentStatus;

/// Lazily yield every `.md` file under `root` that does not carry the
/// completion mark, sorted by file name within each directory.
///
/// Unreadable entries are logged and skipped. A missing root yields nothing.
pub fn candidates(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                let missing_root = e.depth() == 0
                    && e.io_error().map(|io| io.kind()) == Some(std::io::ErrorKind::NotFound);
                if missing_root {
                    debug!(error = %e, "source root does not exist");
                } else {
                    warn!(error = %e, "skipping unreadable entry");
                }
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| is_candidate(path))
}

fn is_candidate(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
        && DocumentStatus::of(path) == DocumentStatus::Pending
}
