//! Docstring insertion into Python source text.
//!
//! Within the element's own line range, the splicer finds the signature
//! line (the first line whose trimmed form ends with `:`). It then walks the
//! body skipping blank lines and any open triple-quoted string, and inserts
//! the block plus one blank line before the first non-blank line outside a
//! string. When no such line exists the block is appended at end of file.
//!
//! Skipped lines are left untouched, with one exception: when every skipped
//! line is blank or made only of quote characters (an empty docstring), the
//! skipped lines are replaced by the block.
//!
//! A line opens a string if it starts with `"""` or `'''` and holds an odd
//! number of that marker; it closes one if it ends with the marker and
//! holds an odd number of it.
//!
//! Each call performs at most one edit. Callers must splice elements in
//! descending start-line order so earlier line numbers stay valid.

use tugdoc_core::text::{count_occurrences, SourceText};

const STRING_MARKERS: [&str; 2] = ["'''", "\"\"\""];

/// What a single splice did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceOutcome {
    /// Block placed in the body; its first line is at this 0-indexed line.
    Inserted { at: usize },
    /// No body line found; block placed at end of file.
    Appended,
    /// No line ending with `:` in the element's line range.
    SignatureNotFound,
}

impl SpliceOutcome {
    /// Whether the text was modified.
    pub fn modified(&self) -> bool {
        !matches!(self, SpliceOutcome::SignatureNotFound)
    }
}

fn opens_string(trimmed: &str) -> bool {
    STRING_MARKERS
        .iter()
        .any(|mark| trimmed.starts_with(mark) && count_occurrences(trimmed, mark) % 2 == 1)
}

fn closes_string(trimmed: &str) -> bool {
    STRING_MARKERS
        .iter()
        .any(|mark| trimmed.ends_with(mark) && count_occurrences(trimmed, mark) % 2 == 1)
}

/// Blank, or nothing but quote characters.
fn is_disposable(line: &str) -> bool {
    line.trim().chars().all(|c| c == '"' || c == '\'')
}

/// 0-indexed signature line in `from..to`.
fn find_signature(text: &SourceText, from: usize, to: usize) -> Option<usize> {
    (from..to.min(text.len())).find(|&i| text.line(i).is_some_and(|l| l.trim().ends_with(':')))
}

/// First non-blank line after the signature outside a triple-quoted string.
fn find_body_line(text: &SourceText, signature: usize) -> Option<usize> {
    let mut in_string = false;
    for index in signature + 1..text.len() {
        let trimmed = text.line(index).unwrap_or_default().trim();
        if !in_string && opens_string(trimmed) {
            in_string = true;
            continue;
        }
        if in_string && closes_string(trimmed) {
            in_string = false;
            continue;
        }
        if !in_string && !trimmed.is_empty() {
            return Some(index);
        }
    }
    None
}

/// Insert `block` into the body of the element spanning
/// `start_line..=end_line`.
///
/// Both lines are 1-indexed, as reported by the parser. The signature must
/// lie within that range; a one-line definition has none.
pub fn splice_docstring(text: &mut SourceText, start_line: u32, end_line: u32, block: &[String]) -> SpliceOutcome {
    let from = (start_line as usize).saturating_sub(1);
    let Some(signature) = find_signature(text, from, end_line as usize) else {
        return SpliceOutcome::SignatureNotFound;
    };

    let mut lines = block.to_vec();
    lines.push(String::new());
    let after_signature = signature + 1;
    let body = find_body_line(text, signature);
    let skipped_end = body.unwrap_or_else(|| text.content_end()).max(after_signature);
    let empty_docstring = (after_signature..skipped_end).all(|i| text.line(i).is_some_and(is_disposable));

    if empty_docstring {
        text.replace_lines(after_signature, skipped_end, lines);
        return match body {
            Some(_) => SpliceOutcome::Inserted { at: after_signature },
            None => SpliceOutcome::Appended,
        };
    }
    match body {
        Some(at) => {
            text.insert_lines(at, lines);
            SpliceOutcome::Inserted { at }
        }
        None => {
            text.append_lines(lines);
            SpliceOutcome::Appended
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
