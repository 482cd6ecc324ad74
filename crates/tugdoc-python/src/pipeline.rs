//! Per-file documentation pipeline.
//!
//! One [`FilePipeline::document_file`] call takes a file through
//!
//! ```text
//! Unparsed -> Parsed -> NoWork
//!                    -> Mutated -> Validated -> Written
//!                               -> Invalid
//! ```
//!
//! The file is read once into a [`SourceText`]; every docstring is spliced
//! in memory in descending start-line order, the result is re-parsed with
//! the same parser and only written back when it is still valid. A file is
//! therefore either fully documented or left byte-for-byte untouched.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use tugdoc_core::adapter::{NlToolkit, SourceParser};
use tugdoc_core::config::Config;
use tugdoc_core::normalize::normalize;
use tugdoc_core::resolve::{elements_to_document, resolve};
use tugdoc_core::text::SourceText;

use crate::docstring::DocstringGenerator;
use crate::splice::splice_docstring;

// ============================================================================
// Outcome Types
// ============================================================================

/// Why a file was not documented.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The source is not valid or is blank.
    #[error("source could not be parsed")]
    ParseInvalid,

    /// Every class and function already has documentation.
    #[error("nothing to document")]
    NothingToDocument,

    /// The documented text no longer parsed; the file was left untouched.
    #[error("documented source failed validation")]
    ValidationFailed,

    /// Reading or writing the file failed.
    #[error("IO error: {0}")]
    Io(String),

    /// The parser itself could not run.
    #[error("parser error: {0}")]
    Parser(String),

    /// The worker processing the file panicked.
    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Final status of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// Written back with `inserted` new docstrings.
    Documented { inserted: usize },
    Failed { reason: FailureReason },
}

/// Result of documenting one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn documented(path: impl Into<PathBuf>, inserted: usize) -> Self {
        FileOutcome {
            path: path.into(),
            status: FileStatus::Documented { inserted },
        }
    }

    pub fn failed(path: impl Into<PathBuf>, reason: FailureReason) -> Self {
        FileOutcome {
            path: path.into(),
            status: FileStatus::Failed { reason },
        }
    }

    pub fn is_documented(&self) -> bool {
        matches!(self.status, FileStatus::Documented { .. })
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.status {
            FileStatus::Failed { reason } => Some(reason),
            FileStatus::Documented { .. } => None,
        }
    }
}

/// Pipeline state of the file being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Unparsed,
    Parsed,
    NoWork,
    Mutated,
    Validated,
    Written,
    Invalid,
}

impl FileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::Unparsed => "unparsed",
            FileState::Parsed => "parsed",
            FileState::NoWork => "no_work",
            FileState::Mutated => "mutated",
            FileState::Validated => "validated",
            FileState::Written => "written",
            FileState::Invalid => "invalid",
        }
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Documents files one at a time with a shared parser and toolkit.
///
/// Holds only shared references, so one pipeline can be used from every
/// worker thread at once.
#[derive(Clone, Copy)]
pub struct FilePipeline<'a> {
    parser: &'a dyn SourceParser,
    toolkit: Option<&'a dyn NlToolkit>,
    config: &'a Config,
}

impl<'a> FilePipeline<'a> {
    pub fn new(parser: &'a dyn SourceParser, toolkit: Option<&'a dyn NlToolkit>, config: &'a Config) -> Self {
        FilePipeline {
            parser,
            toolkit,
            config,
        }
    }

    /// Document every undocumented class and function in `path`.
    pub fn document_file(&self, path: &Path) -> FileOutcome {
        match self.run(path) {
            Ok(inserted) => FileOutcome::documented(path, inserted),
            Err(reason) => FileOutcome::failed(path, reason),
        }
    }

    fn run(&self, path: &Path) -> Result<usize, FailureReason> {
        enter(path, FileState::Unparsed);
        let content = fs::read_to_string(path).map_err(|e| FailureReason::Io(e.to_string()))?;
        let raw = self
            .parser
            .parse(&content)
            .map_err(|e| FailureReason::Parser(e.to_string()))?;

        let mut text = SourceText::new(&content);
        if !raw.valid || text.is_empty() {
            enter(path, FileState::Invalid);
            return Err(FailureReason::ParseInvalid);
        }
        enter(path, FileState::Parsed);

        if raw.has_no_definitions() {
            enter(path, FileState::NoWork);
            return Err(FailureReason::NothingToDocument);
        }

        let conventions = self.parser.conventions();
        let resolved = resolve(normalize(&raw), &conventions);
        let generator = DocstringGenerator::new(conventions, self.toolkit);

        let mut inserted = 0;
        for element in elements_to_document(&resolved) {
            let block = generator.generate(element);
            let outcome = splice_docstring(&mut text, element.start_line, element.end_line, &block);
            if outcome.modified() {
                inserted += 1;
            } else {
                debug!(
                    path = %path.display(),
                    element = %element.qualified_name(),
                    "no signature line found, skipping"
                );
            }
        }

        if inserted == 0 {
            enter(path, FileState::NoWork);
            return Err(FailureReason::NothingToDocument);
        }
        enter(path, FileState::Mutated);

        text.fold_tabs(self.config.tugdoc.indent_width);
        let updated = text.to_text();
        let valid = self
            .parser
            .check_syntax(&updated)
            .map_err(|e| FailureReason::Parser(e.to_string()))?;
        if !valid {
            enter(path, FileState::Invalid);
            warn!(path = %path.display(), "documented source is invalid, file left unchanged");
            return Err(FailureReason::ValidationFailed);
        }
        enter(path, FileState::Validated);

        fs::write(path, updated).map_err(|e| FailureReason::Io(e.to_string()))?;
        enter(path, FileState::Written);
        Ok(inserted)
    }
}

fn enter(path: &Path, state: FileState) {
    debug!(path = %path.display(), state = %state, "file state");
}

// ============================================================================
// Tests
// ============================================================================
