//! In-memory source text with line splicing.
//!
//! [`SourceText`] owns a file's content for the duration of one pipeline
//! run. It is read once, mutated through zero or more line edits,
//! validated by the caller and then either written back or dropped.
//!
//! ## Coordinate Conventions
//!
//! - Line indices taken and returned by this module are **0-indexed**
//! - Lines are split on `\n` only; a `\r` stays part of its line, so an
//!   unmodified `SourceText` round-trips byte-for-byte

use std::fmt;

/// A file's text as a list of lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    lines: Vec<String>,
}

impl SourceText {
    /// Split text into lines.
    pub fn new(text: &str) -> Self {
        SourceText {
            lines: text.split('\n').map(str::to_string).collect(),
        }
    }

    /// Number of lines, counting the empty segment after a trailing newline.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// Line at a 0-indexed position.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Insert lines so that the first new line ends up at `index`.
    ///
    /// An `index` past the end appends.
    pub fn insert_lines<I>(&mut self, index: usize, new_lines: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.replace_lines(index, index, new_lines);
    }

    /// Replace lines `start..end` with `new_lines`.
    ///
    /// Both bounds are clamped to the text.
    pub fn replace_lines<I>(&mut self, start: usize, end: usize, new_lines: I)
    where
        I: IntoIterator<Item = String>,
    {
        let end = end.min(self.lines.len());
        let start = start.min(end);
        let _ = self.lines.splice(start..end, new_lines);
    }

    /// Index one past the last content line; a trailing empty segment left
    /// by a final newline is not content.
    pub fn content_end(&self) -> usize {
        match self.lines.last() {
            Some(last) if last.is_empty() && self.lines.len() > 1 => self.lines.len() - 1,
            _ => self.lines.len(),
        }
    }

    /// Append lines at end of file, keeping a trailing newline trailing.
    pub fn append_lines<I>(&mut self, new_lines: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.insert_lines(self.content_end(), new_lines);
    }

    /// Replace every tab character with `width` spaces.
    pub fn fold_tabs(&mut self, width: usize) {
        let spaces = " ".repeat(width);
        for line in &mut self.lines {
            if line.contains('\t') {
                *line = line.replace('\t', &spaces);
            }
        }
    }

    /// Join the lines back into text.
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Count non-overlapping occurrences of `needle` in `haystack`.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_lossless() {
        for text in ["", "a", "a\n", "a\r\nb\r\n", "\n\n", "x\n\ty\n"] {
            assert_eq!(SourceText::new(text).to_text(), text);
        }
    }

    #[test]
    fn insert_before_index() {
        let mut source = SourceText::new("a\nb\nc");
        source.insert_lines(1, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(source.to_text(), "a\nx\ny\nb\nc");
    }

    #[test]
    fn insert_past_end_appends() {
        let mut source = SourceText::new("a");
        source.insert_lines(10, vec!["b".to_string()]);
        assert_eq!(source.to_text(), "a\nb");
    }

    #[test]
    fn append_keeps_trailing_newline() {
        let mut source = SourceText::new("def f():\n");
        source.append_lines(vec!["    pass".to_string()]);
        assert_eq!(source.to_text(), "def f():\n    pass\n");

        let mut source = SourceText::new("def f():");
        source.append_lines(vec!["    pass".to_string()]);
        assert_eq!(source.to_text(), "def f():\n    pass");
    }

    #[test]
    fn replace_range() {
        let mut source = SourceText::new("a\nb\nc\nd");
        source.replace_lines(1, 3, vec!["x".to_string()]);
        assert_eq!(source.to_text(), "a\nx\nd");
        source.replace_lines(2, 99, Vec::new());
        assert_eq!(source.to_text(), "a\nx");
    }

    #[test]
    fn fold_tabs_uses_width() {
        let mut source = SourceText::new("\t\tx\ny");
        source.fold_tabs(4);
        assert_eq!(source.to_text(), "        x\ny");
    }

    #[test]
    fn blank_text_is_empty() {
        assert!(SourceText::new(" \n\t\n").is_empty());
        assert!(!SourceText::new("x = 1\n").is_empty());
    }

    #[test]
    fn count_occurrences_is_non_overlapping() {
        assert_eq!(count_occurrences(r#""""doc""""#, r#"""""#), 2);
        assert_eq!(count_occurrences(r#""""""""#, r#"""""#), 2);
        assert_eq!(count_occurrences("abc", ""), 0);
    }
}
