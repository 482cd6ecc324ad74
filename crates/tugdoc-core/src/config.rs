//! Configuration handling for tugdoc.
//!
//! Settings live in an optional `tugdoc.toml` at the target root:
//!
//! ```toml
//! [tugdoc]
//! workers = 3
//! blacklist = ["venv", "build", "*.egg-info"]
//! whitelist = []
//! backup_folder = "tugdoc_backup"
//! python = "python3"
//! indent_width = 4
//! formatter = ["black"]
//! import_sorter = ["isort"]
//! nlp_module = "nlputilities.nlp"
//! ```
//!
//! A missing file yields the defaults. An unreadable or malformed file also
//! yields the defaults, with a warning; configuration never aborts a run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// File name looked up at the target root.
pub const CONFIG_FILE_NAME: &str = "tugdoc.toml";

/// Errors from loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// tugdoc configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Documentation run settings
    #[serde(default, alias = "blackdoc")]
    pub tugdoc: TugdocConfig,
}

/// Core tugdoc settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TugdocConfig {
    /// Number of files documented concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Directory names never descended into (`*.suffix` matches by suffix)
    #[serde(default = "default_blacklist")]
    pub blacklist: Vec<String>,

    /// When non-empty, only paths with a directory in this list are documented
    #[serde(default)]
    pub whitelist: Vec<String>,

    /// Backup directory name, created under the target root
    #[serde(default = "default_backup_folder")]
    pub backup_folder: String,

    /// Python interpreter used for parsing and the NL toolkit
    #[serde(default = "default_python")]
    pub python: String,

    /// Spaces each tab folds into when a file is written
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,

    /// Code formatter command
    #[serde(default = "default_formatter")]
    pub formatter: Vec<String>,

    /// Import sorter command
    #[serde(default = "default_import_sorter")]
    pub import_sorter: Vec<String>,

    /// Python module providing the NL toolkit
    #[serde(default = "default_nlp_module")]
    pub nlp_module: String,
}

fn default_workers() -> usize {
    3
}

fn default_blacklist() -> Vec<String> {
    [
        "tugdoc_backup",
        "venv",
        "virtualenv",
        "__pycache__",
        "build",
        "dist",
        "doc",
        "docs",
        "Docs",
        ".git",
        ".idea",
        ".pytest_cache",
        "html",
        "*.egg-info",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_backup_folder() -> String {
    "tugdoc_backup".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_indent_width() -> usize {
    4
}

fn default_formatter() -> Vec<String> {
    vec!["black".to_string()]
}

fn default_import_sorter() -> Vec<String> {
    vec!["isort".to_string()]
}

fn default_nlp_module() -> String {
    "nlputilities.nlp".to_string()
}

impl Default for TugdocConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            blacklist: default_blacklist(),
            whitelist: Vec::new(),
            backup_folder: default_backup_folder(),
            python: default_python(),
            indent_width: default_indent_width(),
            formatter: default_formatter(),
            import_sorter: default_import_sorter(),
            nlp_module: default_nlp_module(),
        }
    }
}

impl TugdocConfig {
    /// Whether a directory name is blacklisted.
    ///
    /// The backup folder is always excluded, even when a custom blacklist
    /// omits it.
    pub fn excludes_dir(&self, name: &str) -> bool {
        name == self.backup_folder || self.blacklist.iter().any(|entry| matches_entry(entry, name))
    }

    /// Whether a directory name is whitelisted.
    pub fn includes_dir(&self, name: &str) -> bool {
        self.whitelist.iter().any(|entry| matches_entry(entry, name))
    }
}

fn matches_entry(entry: &str, name: &str) -> bool {
    match entry.strip_prefix('*') {
        Some(suffix) => name.ends_with(suffix),
        None => entry == name,
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `tugdoc.toml` from the given root, falling back to defaults.
    pub fn load_from_root(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            info!(root = %root.display(), "no {} found, using defaults", CONFIG_FILE_NAME);
            return Config::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "ignoring configuration file, using defaults");
                Config::default()
            }
        }
    }

    /// A copy with command-line overrides applied.
    pub fn with_overrides(&self, workers: Option<usize>) -> Self {
        let mut config = self.clone();
        if let Some(workers) = workers {
            config.tugdoc.workers = workers.max(1);
        }
        config
    }
}

// ============================================================================
// Tests
// ============================================================================
