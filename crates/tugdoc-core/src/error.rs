//! Error types and error code constants for tugdoc.
//!
//! `TugdocError` is the unified error for CLI output. Subsystem errors
//! (configuration, file discovery, IO) are bridged into it with `From`
//! impls so the binary can map any failure to a stable exit code.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Resolution errors (file not found, unsupported file type)
//! - `4`: Apply errors (failed to back up or write files)
//! - `5`: Validation failed (source no longer parses after splicing)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! Per-file failures during a run are *not* `TugdocError`s. They are
//! collected into the run summary and the run still exits `0`.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::files::FileError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and CLI exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller.
    InvalidArguments = 2,
    /// Resolution errors (file not found, unsupported file type).
    ResolutionError = 3,
    /// Apply errors (failed to write or back up files).
    ApplyError = 4,
    /// Source failed validation after modification.
    ValidationFailed = 5,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum TugdocError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Single-file mode was given something other than a Python file.
    #[error("unsupported file type: {path} (expected a .py file)")]
    UnsupportedFileType { path: String },

    /// File or directory not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Failed to write or back up files.
    #[error("apply error: {message}")]
    ApplyError {
        message: String,
        path: Option<String>,
    },

    /// A modified file no longer parses.
    #[error("validation failed: {path}")]
    ValidationFailed { path: String },

    /// Configuration could not be loaded.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&TugdocError> for OutputErrorCode {
    fn from(err: &TugdocError) -> Self {
        match err {
            TugdocError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            TugdocError::UnsupportedFileType { .. } => OutputErrorCode::ResolutionError,
            TugdocError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            TugdocError::ApplyError { .. } => OutputErrorCode::ApplyError,
            TugdocError::ValidationFailed { .. } => OutputErrorCode::ValidationFailed,
            TugdocError::Config { .. } => OutputErrorCode::InvalidArguments,
            TugdocError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<TugdocError> for OutputErrorCode {
    fn from(err: TugdocError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<ConfigError> for TugdocError {
    fn from(err: ConfigError) -> Self {
        TugdocError::Config {
            message: err.to_string(),
        }
    }
}

impl From<FileError> for TugdocError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotFound { path } => TugdocError::FileNotFound { path },
            FileError::Io(io_err) => TugdocError::ApplyError {
                message: format!("IO error: {}", io_err),
                path: None,
            },
        }
    }
}

impl From<io::Error> for TugdocError {
    fn from(err: io::Error) -> Self {
        TugdocError::ApplyError {
            message: format!("IO error: {}", err),
            path: None,
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl TugdocError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        TugdocError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        TugdocError::FileNotFound { path: path.into() }
    }

    /// Create an apply error tied to a path.
    pub fn apply(message: impl Into<String>, path: impl Into<String>) -> Self {
        TugdocError::ApplyError {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        TugdocError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
