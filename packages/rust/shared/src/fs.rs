//! Crash-safe file writes.

use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Write `contents` to `path` atomically: write a sibling temp file, flush it
/// to disk, then rename it over the target.
///
/// A crash leaves either the previous file or the new one, never a partial
/// write. On error the temp file is removed. The parent directory must exist.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let temp = temp_path_for(path);

    let result = (|| {
        let mut file = std::fs::File::create(&temp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        std::fs::rename(&temp, path)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&temp);
    }
    result
}

/// Hidden sibling temp path: `.<name>.<uuid>.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", Uuid::now_v7()))
}
