//! Source file discovery.
//!
//! Walks the target root for files with the language's extension. The
//! blacklist and whitelist are checked against the directory components of
//! each file's path *relative to the root*, so the root's own location
//! (a temp dir, a home directory) never influences filtering.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::TugdocConfig;

// ============================================================================
// Error Types
// ============================================================================

/// Error type for file operations.
#[derive(Debug, Error)]
pub enum FileError {
    /// File not found.
    #[error("file not found: {path}")]
    NotFound { path: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for file operations.
pub type FileResult<T> = Result<T, FileError>;

// ============================================================================
// Discovery
// ============================================================================

/// Collect `.py` files under `root`, sorted by path.
pub fn discover_python_files(root: &Path, config: &TugdocConfig) -> FileResult<Vec<PathBuf>> {
    discover_files(root, "py", config)
}

/// Collect files with `extension` under `root`, sorted by path.
///
/// Blacklisted directories are pruned from the walk. When the whitelist is
/// non-empty, a file is kept only if one of its directory components is
/// whitelisted.
pub fn discover_files(root: &Path, extension: &str, config: &TugdocConfig) -> FileResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(FileError::NotFound {
            path: root.display().to_string(),
        });
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !config.excludes_dir(&entry.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| io::Error::other("filesystem loop detected"))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != extension) {
            continue;
        }

        let rel_path = match path.strip_prefix(root) {
            Ok(p) => p,
            Err(_) => continue,
        };

        if !config.whitelist.is_empty() && !has_whitelisted_dir(rel_path, config) {
            debug!(path = %rel_path.display(), "not in whitelist");
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

fn has_whitelisted_dir(rel_path: &Path, config: &TugdocConfig) -> bool {
    rel_path
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .any(|component| config.includes_dir(&component.as_os_str().to_string_lossy()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x = 1\n").unwrap();
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn finds_python_files_sorted() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "b.py");
        touch(temp.path(), "a.py");
        touch(temp.path(), "pkg/c.py");
        touch(temp.path(), "notes.txt");

        let files = discover_python_files(temp.path(), &TugdocConfig::default()).unwrap();
        assert_eq!(relative(temp.path(), &files), vec!["a.py", "b.py", "pkg/c.py"]);
    }

    #[test]
    fn blacklisted_directories_are_pruned() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/ok.py");
        touch(temp.path(), "venv/lib/site.py");
        touch(temp.path(), "src/__pycache__/ok.py");
        touch(temp.path(), "mypkg.egg-info/setup.py");
        touch(temp.path(), "tugdoc_backup/ok.py");

        let files = discover_python_files(temp.path(), &TugdocConfig::default()).unwrap();
        assert_eq!(relative(temp.path(), &files), vec!["src/ok.py"]);
    }

    #[test]
    fn whitelist_requires_matching_component() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "top.py");
        touch(temp.path(), "app/core/model.py");
        touch(temp.path(), "scripts/run.py");

        let config = TugdocConfig {
            whitelist: vec!["app".to_string()],
            ..TugdocConfig::default()
        };
        let files = discover_python_files(temp.path(), &config).unwrap();
        assert_eq!(relative(temp.path(), &files), vec!["app/core/model.py"]);
    }

    #[test]
    fn root_under_blacklisted_name_is_still_walked() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("build");
        touch(&root, "mod.py");

        let files = discover_python_files(&root, &TugdocConfig::default()).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn missing_root_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = discover_python_files(&temp.path().join("nope"), &TugdocConfig::default()).unwrap_err();
        assert!(matches!(err, FileError::NotFound { .. }));
    }
}
