//! Element normalization: raw parser records to [`CodeElement`]s.
//!
//! Normalization never fails as a whole. A record missing one of the
//! required fields (`name`, `start_line`, `end_line`), or whose range is
//! inverted, is dropped with a warning and the rest of the file proceeds.
//! Missing optional fields are replaced by empty strings and lists.
//!
//! Derived fields computed here:
//! - `total_lines`: `end_line - start_line + 1`
//! - `lines_of_code`: `total_lines` minus the docstring's line count
//! - `parameter_count` and `annotated_parameter_count`

use thiserror::Error;
use tracing::warn;

use crate::adapter::{RawClass, RawException, RawFile, RawFunction, RawParameter, RawVariable};
use crate::element::{CodeElement, ElementKind, ExceptionRecord, Parameter, Variable};

// ============================================================================
// Error Types
// ============================================================================

/// Why a single raw record was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// A required field is absent or empty.
    #[error("{record} record #{index} is missing required field '{field}'")]
    MissingField {
        record: &'static str,
        index: usize,
        field: &'static str,
    },

    /// `start_line` is after `end_line`.
    #[error("{record} record '{name}' has inverted range {start_line}..{end_line}")]
    InvertedRange {
        record: &'static str,
        name: String,
        start_line: u32,
        end_line: u32,
    },
}

/// Result type for extraction of a single record.
pub type ExtractionResult<T> = Result<T, ExtractionError>;

// ============================================================================
// Normalized Output
// ============================================================================

/// Canonical elements for one file.
#[derive(Debug, Clone, Default)]
pub struct NormalizedFile {
    pub classes: Vec<CodeElement>,
    pub functions: Vec<CodeElement>,
    pub exceptions: Vec<ExceptionRecord>,
    /// Number of raw records dropped as malformed.
    pub dropped: usize,
}

/// Normalize every record of a parsed file.
pub fn normalize(raw: &RawFile) -> NormalizedFile {
    let mut out = NormalizedFile::default();

    for (index, record) in raw.classes.iter().enumerate() {
        match normalize_class(index, record) {
            Ok(element) => out.classes.push(element),
            Err(err) => drop_record(&mut out, err),
        }
    }
    for (index, record) in raw.functions.iter().enumerate() {
        match normalize_function(index, record) {
            Ok(element) => out.functions.push(element),
            Err(err) => drop_record(&mut out, err),
        }
    }
    for (index, record) in raw.exceptions.iter().enumerate() {
        match normalize_exception(index, record) {
            Ok(exception) => out.exceptions.push(exception),
            Err(err) => drop_record(&mut out, err),
        }
    }

    out
}

fn drop_record(out: &mut NormalizedFile, err: ExtractionError) {
    warn!(error = %err, "dropping malformed parser record");
    out.dropped += 1;
}

// ============================================================================
// Per-Record Normalization
// ============================================================================

/// Normalize one raw class record.
pub fn normalize_class(index: usize, raw: &RawClass) -> ExtractionResult<CodeElement> {
    let (name, start_line, end_line) =
        required("class", index, raw.name.as_deref(), raw.start_line, raw.end_line)?;

    let mut element = CodeElement::new(name, ElementKind::Class, start_line, end_line);
    element.documentation = raw.documentation.clone().unwrap_or_default();
    element.enclosing_context = raw.context.clone().unwrap_or_default();
    element.inheritance = raw
        .inheritance
        .iter()
        .flatten()
        .filter(|base| !base.trim().is_empty())
        .cloned()
        .collect();
    element.class_variables = variables(raw.class_variables.as_deref());
    element.instance_variables = variables(raw.instance_variables.as_deref());
    element.lines_of_code = lines_of_code(element.total_lines, &element.documentation);

    Ok(element)
}

/// Normalize one raw function record.
///
/// The kind is [`ElementKind::ClassMethod`] when the record names an owner.
pub fn normalize_function(index: usize, raw: &RawFunction) -> ExtractionResult<CodeElement> {
    let (name, start_line, end_line) =
        required("function", index, raw.name.as_deref(), raw.start_line, raw.end_line)?;

    let owner = raw.owner.clone().unwrap_or_default();
    let kind = if owner.trim().is_empty() {
        ElementKind::Function
    } else {
        ElementKind::ClassMethod
    };

    let mut element = CodeElement::new(name, kind, start_line, end_line);
    element.owner = owner.trim().to_string();
    element.documentation = raw.documentation.clone().unwrap_or_default();
    element.enclosing_context = raw.context.clone().unwrap_or_default();
    element.parameters = raw
        .parameters
        .iter()
        .flatten()
        .filter_map(parameter)
        .collect();
    element.return_type_hint = non_empty(raw.returns.as_deref());
    element.parameter_count = element.parameters.len();
    element.annotated_parameter_count =
        element.parameters.iter().filter(|p| p.is_annotated()).count();
    element.lines_of_code = lines_of_code(element.total_lines, &element.documentation);

    Ok(element)
}

/// Normalize one raw exception record.
pub fn normalize_exception(index: usize, raw: &RawException) -> ExtractionResult<ExceptionRecord> {
    let (name, start_line, end_line) =
        required("exception", index, raw.name.as_deref(), raw.start_line, raw.end_line)?;

    Ok(ExceptionRecord {
        exception_name: name.to_string(),
        alias: non_empty(raw.alias.as_deref()),
        start_line,
        end_line,
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn required<'a>(
    record: &'static str,
    index: usize,
    name: Option<&'a str>,
    start_line: Option<u32>,
    end_line: Option<u32>,
) -> ExtractionResult<(&'a str, u32, u32)> {
    let missing = |field| ExtractionError::MissingField {
        record,
        index,
        field,
    };

    let name = name.map(str::trim).filter(|n| !n.is_empty()).ok_or_else(|| missing("name"))?;
    let start_line = start_line.ok_or_else(|| missing("start_line"))?;
    let end_line = end_line.ok_or_else(|| missing("end_line"))?;

    if start_line > end_line {
        return Err(ExtractionError::InvertedRange {
            record,
            name: name.to_string(),
            start_line,
            end_line,
        });
    }

    Ok((name, start_line, end_line))
}

fn parameter(raw: &RawParameter) -> Option<Parameter> {
    let name = raw.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
    Some(Parameter {
        name: name.to_string(),
        type_hint: non_empty(raw.type_hint.as_deref()),
        default_value: raw.default.clone(),
    })
}

fn variables(raw: Option<&[RawVariable]>) -> Vec<Variable> {
    raw.unwrap_or_default()
        .iter()
        .filter_map(|v| v.name.as_deref())
        .filter(|n| !n.trim().is_empty())
        .map(|n| Variable {
            name: n.trim().to_string(),
        })
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn lines_of_code(total_lines: u32, documentation: &str) -> u32 {
    if documentation.trim().is_empty() {
        total_lines
    } else {
        total_lines.saturating_sub(documentation.lines().count() as u32)
    }
}

// ============================================================================
// Tests
// ============================================================================
