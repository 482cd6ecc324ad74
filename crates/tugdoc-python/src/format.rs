//! Formatter and import-sorter drivers.
//!
//! After documentation, the files that gained docstrings are handed to an
//! external code formatter and an import sorter. Both are plain command
//! vectors from configuration with the target paths appended. Formatting is
//! best-effort: callers log failures and carry on.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use tugdoc_core::config::TugdocConfig;

// ============================================================================
// Types
// ============================================================================

/// Outcome of one formatter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatStatus {
    /// The command exited successfully.
    Passed,
    /// The command ran and exited with a failure status.
    Failed,
}

/// Report of one formatter invocation.
#[derive(Debug, Clone, Serialize)]
pub struct FormatReport {
    /// Formatter name, e.g. "black".
    pub name: String,
    pub status: FormatStatus,
    pub duration_ms: u64,
    /// Output (stdout + stderr).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that prevent a formatter from running at all.
#[derive(Debug, Error)]
pub enum FormatterError {
    /// The configured command vector is empty.
    #[error("no command configured for {name}")]
    EmptyCommand { name: String },

    /// The program is not on PATH.
    #[error("{program} not found on PATH")]
    NotFound { program: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for formatter operations.
pub type FormatterResult<T> = Result<T, FormatterError>;

// ============================================================================
// CommandFormatter
// ============================================================================

/// A formatter run as `<command...> <path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFormatter {
    name: String,
    command: Vec<String>,
}

impl CommandFormatter {
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        CommandFormatter {
            name: name.into(),
            command,
        }
    }

    /// The code formatter configured in `[tugdoc] formatter`.
    pub fn black(config: &TugdocConfig) -> Self {
        CommandFormatter::new("black", config.formatter.clone())
    }

    /// The import sorter configured in `[tugdoc] import_sorter`.
    pub fn isort(config: &TugdocConfig) -> Self {
        CommandFormatter::new("isort", config.import_sorter.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the command on `path`.
    pub fn format_path(&self, path: &Path) -> FormatterResult<FormatReport> {
        self.format_paths(&[path])
    }

    /// Run the command once on all of `paths`.
    pub fn format_paths<P: AsRef<Path>>(&self, paths: &[P]) -> FormatterResult<FormatReport> {
        let (program, args) = self.command.split_first().ok_or_else(|| FormatterError::EmptyCommand {
            name: self.name.clone(),
        })?;
        let program = locate(program)?;

        debug!(formatter = %self.name, files = paths.len(), "running formatter");
        let start = Instant::now();
        let output = Command::new(&program)
            .args(args)
            .args(paths.iter().map(<P as AsRef<Path>>::as_ref))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let status = if output.status.success() {
            FormatStatus::Passed
        } else {
            FormatStatus::Failed
        };

        let combined_output = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        Ok(FormatReport {
            name: self.name.clone(),
            status,
            duration_ms,
            output: if combined_output.trim().is_empty() {
                None
            } else {
                Some(combined_output)
            },
        })
    }

    /// Run the command on `paths`, logging instead of failing.
    pub fn run_best_effort<P: AsRef<Path>>(&self, paths: &[P]) -> Option<FormatReport> {
        if paths.is_empty() {
            return None;
        }
        match self.format_paths(paths) {
            Ok(report) if report.status == FormatStatus::Passed => {
                info!(formatter = %self.name, files = paths.len(), "formatted");
                Some(report)
            }
            Ok(report) => {
                warn!(
                    formatter = %self.name,
                    output = report.output.as_deref().unwrap_or(""),
                    "formatter failed"
                );
                Some(report)
            }
            Err(err) => {
                warn!(formatter = %self.name, error = %err, "formatter skipped");
                None
            }
        }
    }
}

/// Absolute path of `program`; names with a separator are taken as given.
fn locate(program: &str) -> FormatterResult<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return if candidate.exists() {
            Ok(candidate.to_path_buf())
        } else {
            Err(FormatterError::NotFound {
                program: program.to_string(),
            })
        };
    }
    which::which(program).map_err(|_| FormatterError::NotFound {
        program: program.to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================
