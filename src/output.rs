//! Run summaries and error responses.
//!
//! A completed run prints a [`RunSummary`] to stdout, either as the plain
//! text report or as JSON. A run that could not start prints an
//! [`ErrorResponse`] as a single JSON line and exits with its error code.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::SystemTime;

use serde::Serialize;

use tugdoc_core::error::{OutputErrorCode, TugdocError};
use tugdoc_python::format::FormatReport;
use tugdoc_python::pipeline::{FailureReason, FileOutcome, FileStatus};

/// Schema version of JSON output.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Run Summary
// ============================================================================

/// A file that was not documented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub reason: FailureReason,
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// When the run started (ISO 8601).
    pub started_at: String,
    /// Number of files handed to the pipeline.
    pub discovered: usize,
    /// Number of files written back with new docstrings.
    pub documented: usize,
    /// Total docstrings inserted across all files.
    pub docstrings_inserted: usize,
    /// Files that were left unchanged, in discovery order.
    pub failed: Vec<FailedFile>,
    /// Formatter runs over the documented files.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub formatting: Vec<FormatReport>,
}

impl RunSummary {
    /// Summarize per-file outcomes, given in discovery order.
    pub fn new(started: SystemTime, outcomes: &[FileOutcome]) -> Self {
        let mut documented = 0;
        let mut docstrings_inserted = 0;
        let mut failed = Vec::new();
        for outcome in outcomes {
            match outcome.failure() {
                None => documented += 1,
                Some(reason) => failed.push(FailedFile {
                    path: outcome.path.clone(),
                    reason: reason.clone(),
                }),
            }
            if let FileStatus::Documented { inserted } = outcome.status {
                docstrings_inserted += inserted;
            }
        }

        RunSummary {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            started_at: format_timestamp(started),
            discovered: outcomes.len(),
            documented,
            docstrings_inserted,
            failed,
            formatting: Vec::new(),
        }
    }

    /// The first file that failed validation, if any.
    pub fn validation_failure(&self) -> Option<&FailedFile> {
        self.failed
            .iter()
            .find(|f| f.reason == FailureReason::ValidationFailed)
    }

    /// The plain text report.
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "Successfully documented {} out of {} files found\n",
            self.documented, self.discovered
        );
        if !self.failed.is_empty() {
            out.push_str("Failed to document:\n");
            for file in &self.failed {
                out.push_str(&format!("  {} ({})\n", file.path.display(), file.reason));
            }
        }
        out
    }
}

/// Format a timestamp for JSON output (ISO 8601).
fn format_timestamp(time: SystemTime) -> String {
    use chrono::{DateTime, Utc};

    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ============================================================================
// Error Response
// ============================================================================

/// Error details in JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Numeric error code; also the process exit code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// File the error is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorInfo {
    pub fn from_error(err: &TugdocError) -> Self {
        let path = match err {
            TugdocError::UnsupportedFileType { path }
            | TugdocError::FileNotFound { path }
            | TugdocError::ValidationFailed { path } => Some(path.clone()),
            TugdocError::ApplyError { path, .. } => path.clone(),
            _ => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            path,
        }
    }
}

/// Response emitted when a run cannot complete.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &TugdocError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a response as compact JSON (single line) to a writer.
pub fn emit_response_compact<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string(response).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
