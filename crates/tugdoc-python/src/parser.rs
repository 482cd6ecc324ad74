//! Python source parser backed by the interpreter's own `ast` module.
//!
//! Each call runs the embedded `ast_worker.py` once: source on stdin, a
//! [`RawFile`] as JSON on stdout. A process per call keeps the parser free of
//! shared state, so file workers can parse concurrently.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use tugdoc_core::adapter::{LanguageConventions, ParseError, ParseResult, RawFile, SourceParser};

use crate::worker::{resolve_python, WorkerError};

/// Embedded parser script.
const AST_SCRIPT: &str = include_str!("ast_worker.py");

/// Python naming conventions.
pub const PYTHON_CONVENTIONS: LanguageConventions = LanguageConventions {
    initializer_name: "__init__",
    receiver_name: "self",
    extension: "py",
};

/// [`SourceParser`] that shells out to Python's `ast` module.
#[derive(Debug, Clone)]
pub struct PythonAstParser {
    python_path: PathBuf,
}

impl PythonAstParser {
    /// Create a parser using `python` (a name on `PATH` or a path).
    pub fn new(python: &str) -> ParseResult<Self> {
        let python_path = resolve_python(python).map_err(|err| match err {
            WorkerError::PythonNotFound { path } => ParseError::SpawnFailed {
                reason: format!("Python interpreter not found: {}", path.display()),
            },
            other => ParseError::SpawnFailed {
                reason: other.to_string(),
            },
        })?;
        Ok(PythonAstParser { python_path })
    }

    pub fn python_path(&self) -> &std::path::Path {
        &self.python_path
    }
}

impl SourceParser for PythonAstParser {
    fn conventions(&self) -> LanguageConventions {
        PYTHON_CONVENTIONS
    }

    fn parse(&self, source: &str) -> ParseResult<RawFile> {
        let mut child = Command::new(&self.python_path)
            .args(["-c", AST_SCRIPT])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ParseError::SpawnFailed {
                reason: e.to_string(),
            })?;

        // Dropping stdin after the write closes the pipe so the script sees EOF.
        {
            let mut stdin = child.stdin.take().ok_or_else(|| ParseError::SpawnFailed {
                reason: "failed to capture stdin".to_string(),
            })?;
            stdin.write_all(source.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(ParseError::Failed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let raw: RawFile = serde_json::from_slice(&output.stdout).map_err(|e| ParseError::InvalidOutput {
            reason: e.to_string(),
        })?;
        debug!(
            valid = raw.valid,
            classes = raw.classes.len(),
            functions = raw.functions.len(),
            exceptions = raw.exceptions.len(),
            "parsed source"
        );
        Ok(raw)
    }
}

// ============================================================================
// Tests
// ============================================================================
