//! Adapter contracts for external collaborators.
//!
//! tugdoc does not parse source code or analyze natural language itself.
//! Both are supplied through the traits in this module:
//!
//! - [`SourceParser`]: syntax validation plus raw class/function/exception
//!   records with line ranges
//! - [`NlToolkit`]: identifier segmentation, spell correction, POS and
//!   dependency tagging, verb stemming and a fixed set of known verbs
//!
//! # Raw Records
//!
//! Parsers report records as the `Raw*` types below. Every field is optional
//! so that a partially populated record still deserializes; the normalizer
//! (see [`crate::normalize`]) decides which records are usable and fills in
//! defaults for the rest.
//!
//! # Thread Safety
//!
//! One parser and one toolkit handle are shared by every file worker, so
//! both traits require `Send + Sync`. Implementations that wrap a single
//! external process must serialize access internally.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Language Conventions
// ============================================================================

/// Naming conventions of the documented language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageConventions {
    /// Reserved name of the object initializer method.
    pub initializer_name: &'static str,
    /// Conventional name of the receiver parameter of instance methods.
    pub receiver_name: &'static str,
    /// Source file extension, without the dot.
    pub extension: &'static str,
}

// ============================================================================
// Raw Parser Records
// ============================================================================

/// Everything a parser reports for one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFile {
    /// Whether the source is syntactically valid.
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub classes: Vec<RawClass>,
    #[serde(default)]
    pub functions: Vec<RawFunction>,
    #[serde(default)]
    pub exceptions: Vec<RawException>,
}

impl RawFile {
    /// A result for source that failed syntax validation.
    pub fn invalid() -> Self {
        RawFile::default()
    }

    /// Whether the parser found neither classes nor functions.
    pub fn has_no_definitions(&self) -> bool {
        self.classes.is_empty() && self.functions.is_empty()
    }
}

/// A raw class record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawClass {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_line: Option<u32>,
    #[serde(default)]
    pub end_line: Option<u32>,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub inheritance: Option<Vec<String>>,
    #[serde(default)]
    pub class_variables: Option<Vec<RawVariable>>,
    #[serde(default)]
    pub instance_variables: Option<Vec<RawVariable>>,
    /// Ancestor scope names, outermost first.
    #[serde(default)]
    pub context: Option<Vec<String>>,
}

/// A raw variable record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawVariable {
    #[serde(default)]
    pub name: Option<String>,
}

/// A raw function or method record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFunction {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_line: Option<u32>,
    #[serde(default)]
    pub end_line: Option<u32>,
    #[serde(default)]
    pub parameters: Option<Vec<RawParameter>>,
    #[serde(default)]
    pub returns: Option<String>,
    /// Owning class name, empty for free functions.
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub documentation: Option<String>,
    /// Ancestor scope names, outermost first.
    #[serde(default)]
    pub context: Option<Vec<String>>,
}

/// A raw parameter record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawParameter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub type_hint: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
}

/// A raw exception record (raise site or handler).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawException {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub start_line: Option<u32>,
    #[serde(default)]
    pub end_line: Option<u32>,
}

// ============================================================================
// Source Parser
// ============================================================================

/// Errors raised when the parser adapter itself cannot run.
///
/// Invalid *source* is not an error: it is reported as `RawFile::valid == false`.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The parser process could not be started.
    #[error("failed to start parser: {reason}")]
    SpawnFailed { reason: String },

    /// The parser process exited unsuccessfully.
    #[error("parser exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },

    /// The parser produced output that could not be decoded.
    #[error("invalid parser output: {reason}")]
    InvalidOutput { reason: String },

    /// IO error while talking to the parser.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Syntax validation and record extraction for one language.
pub trait SourceParser: Send + Sync {
    /// Conventions of the language this parser understands.
    fn conventions(&self) -> LanguageConventions;

    /// Parse source text into raw records.
    fn parse(&self, source: &str) -> ParseResult<RawFile>;

    /// Check that source text is syntactically valid.
    fn check_syntax(&self, source: &str) -> ParseResult<bool> {
        Ok(self.parse(source)?.valid)
    }
}

// ============================================================================
// NL Toolkit
// ============================================================================

/// A word tagged by the POS/dependency tagger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub word: String,
    /// Universal POS tag, e.g. `NOUN`, `VERB`.
    pub pos_tag: String,
    /// Dependency role, e.g. `ROOT`, `compound`.
    pub role: String,
}

impl TaggedToken {
    pub fn new(word: impl Into<String>, pos_tag: impl Into<String>, role: impl Into<String>) -> Self {
        TaggedToken {
            word: word.into(),
            pos_tag: pos_tag.into(),
            role: role.into(),
        }
    }
}

/// Errors from the NL toolkit.
#[derive(Debug, Error)]
pub enum ToolkitError {
    /// The toolkit is not running or has shut down.
    #[error("NL toolkit unavailable: {reason}")]
    Unavailable { reason: String },

    /// The toolkit rejected or failed a request.
    #[error("NL toolkit request '{op}' failed: {message}")]
    RequestFailed { op: String, message: String },

    /// The toolkit answered with something other than what was asked for.
    #[error("unexpected NL toolkit reply to '{op}'")]
    UnexpectedReply { op: String },
}

/// Result type for NL toolkit operations.
pub type ToolkitResult<T> = Result<T, ToolkitError>;

/// Natural-language analysis of identifiers.
pub trait NlToolkit: Send + Sync {
    /// Split an identifier into word segments.
    fn segment(&self, identifier: &str) -> ToolkitResult<Vec<String>>;

    /// Spell-correct segmented words.
    fn spell_correct(&self, words: &[String]) -> ToolkitResult<Vec<String>>;

    /// POS and dependency tagging of a phrase.
    fn pos_dependency_tag(&self, phrase: &str) -> ToolkitResult<Vec<TaggedToken>>;

    /// Stem verbs; one stem per input word.
    fn stem(&self, words: &[String]) -> ToolkitResult<Vec<String>>;

    /// The fixed set of words known to be verbs.
    fn known_verbs(&self) -> &HashSet<String>;
}

// ============================================================================
// Tests
// ============================================================================
