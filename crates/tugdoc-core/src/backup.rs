//! Whole-tree backup before a run.
//!
//! The target root is copied into `<root>/<folder>`. An existing backup is
//! replaced. The backup folder itself is never copied into itself.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

/// Copy `root` into `root/folder`, replacing any previous backup.
///
/// Returns the backup directory. Symlinks are not followed.
pub fn create_backup(root: &Path, folder: &str) -> io::Result<PathBuf> {
    if folder.is_empty() || Path::new(folder).components().count() != 1 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("backup folder must be a single directory name, got '{}'", folder),
        ));
    }

    let backup_dir = root.join(folder);
    if backup_dir.exists() {
        fs::remove_dir_all(&backup_dir)?;
    }
    fs::create_dir_all(&backup_dir)?;

    let mut copied = 0usize;
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.path() != backup_dir);

    for entry in walker {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| io::Error::other("filesystem loop detected"))
        })?;
        let rel_path = match entry.path().strip_prefix(root) {
            Ok(p) if !p.as_os_str().is_empty() => p,
            _ => continue,
        };
        let target = backup_dir.join(rel_path);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    info!(backup = %backup_dir.display(), files = copied, "created backup");
    Ok(backup_dir)
}

// ============================================================================
// Tests
// ============================================================================
