//! Test support: fakes for the parser and NL toolkit adapters.
//!
//! - [`IndentParser`]: a small indentation-based Python reader good enough
//!   to drive the pipeline without an interpreter
//! - [`StaticParser`]: returns fixed records, rejecting sources that contain
//!   a marker
//! - [`FakeToolkit`] / [`FailingToolkit`]: table-driven NL toolkits
//!
//! Tests that need a real interpreter call [`find_python`] and return early
//! when it is `None`.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use tugdoc_core::adapter::{
    LanguageConventions, NlToolkit, ParseResult, RawClass, RawException, RawFile, RawFunction,
    RawParameter, RawVariable, SourceParser, TaggedToken, ToolkitError, ToolkitResult,
};

use crate::parser::PYTHON_CONVENTIONS;

/// A Python interpreter on `PATH`, if any.
pub fn find_python() -> Option<PathBuf> {
    which::which("python3").or_else(|_| which::which("python")).ok()
}

// ============================================================================
// StaticParser
// ============================================================================

/// Parser returning the same records for every source.
#[derive(Debug, Clone)]
pub struct StaticParser {
    raw: RawFile,
    reject_marker: Option<String>,
}

impl StaticParser {
    pub fn new(raw: RawFile) -> Self {
        StaticParser {
            raw,
            reject_marker: None,
        }
    }

    /// Report any source containing `marker` as invalid.
    pub fn rejecting(mut self, marker: impl Into<String>) -> Self {
        self.reject_marker = Some(marker.into());
        self
    }
}

impl SourceParser for StaticParser {
    fn conventions(&self) -> LanguageConventions {
        PYTHON_CONVENTIONS
    }

    fn parse(&self, source: &str) -> ParseResult<RawFile> {
        let rejected = self
            .reject_marker
            .as_deref()
            .is_some_and(|marker| source.contains(marker));
        if rejected {
            return Ok(RawFile::invalid());
        }
        Ok(self.raw.clone())
    }
}

// ============================================================================
// IndentParser
// ============================================================================

/// Indentation-based reader for simple Python sources.
///
/// Understands one-line `class`/`def` headers, triple-quoted docstrings,
/// `raise X` and `except X as y`. Validation checks block structure the way
/// the tokenizer does (indents after `:`, dedents to a known level) and
/// balanced triple quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndentParser;

#[derive(Debug, Clone, Copy)]
struct LineInfo {
    indent: usize,
    blank: bool,
    /// Line starts inside a multi-line string.
    in_string: bool,
}

fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width = (width / 8 + 1) * 8,
            _ => break,
        }
    }
    width
}

fn scan_lines(source: &str) -> (Vec<LineInfo>, bool) {
    let mut infos = Vec::new();
    let mut in_string: Option<&str> = None;
    for line in source.split('\n') {
        let trimmed = line.trim();
        infos.push(LineInfo {
            indent: indent_width(line),
            blank: trimmed.is_empty() || trimmed.starts_with('#'),
            in_string: in_string.is_some(),
        });
        for mark in ["\"\"\"", "'''"] {
            let count = line.matches(mark).count();
            if count % 2 == 1 {
                in_string = match in_string {
                    Some(open) if open == mark => None,
                    None => Some(mark),
                    other => other,
                };
            }
        }
    }
    (infos, in_string.is_none())
}

fn structure_is_valid(source: &str, infos: &[LineInfo]) -> bool {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut stack = vec![0usize];
    let mut expect_indent = false;

    for (line, info) in lines.iter().zip(infos) {
        if info.blank || info.in_string {
            continue;
        }
        let top = stack.last().copied().unwrap_or(0);
        if expect_indent {
            if info.indent <= top {
                return false;
            }
            stack.push(info.indent);
            expect_indent = false;
        } else if info.indent > top {
            return false;
        } else {
            while stack.last().is_some_and(|&level| level > info.indent) {
                stack.pop();
            }
            if stack.last() != Some(&info.indent) {
                return false;
            }
        }

        let trimmed = line.trim();
        let is_header = header_keyword(trimmed).is_some();
        if is_header && !trimmed.ends_with(':') {
            return false;
        }
        if trimmed.ends_with(':') {
            expect_indent = true;
        }
    }
    !expect_indent
}

fn header_keyword(trimmed: &str) -> Option<&'static str> {
    if trimmed.starts_with("class ") {
        Some("class")
    } else if trimmed.starts_with("def ") || trimmed.starts_with("async def ") {
        Some("def")
    } else {
        None
    }
}

fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        if ch == separator && depth == 0 {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

fn parse_parameter(text: &str) -> Option<RawParameter> {
    let text = text.trim_start_matches('*').trim();
    if text.is_empty() || text == "/" {
        return None;
    }
    let (left, default) = match text.split_once('=') {
        Some((left, default)) => (left.trim(), Some(unquote(default.trim()))),
        None => (text, None),
    };
    let (name, hint) = match left.split_once(':') {
        Some((name, hint)) => (name.trim(), Some(hint.trim().to_string())),
        None => (left, None),
    };
    Some(RawParameter {
        name: Some(name.to_string()),
        type_hint: hint,
        default,
    })
}

fn header_name(rest: &str) -> String {
    rest.chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

fn between_parens(text: &str) -> Option<&str> {
    let open = text.find('(')?;
    let close = text.rfind(')')?;
    (close > open).then(|| &text[open + 1..close])
}

impl IndentParser {
    fn docstring(lines: &[&str], infos: &[LineInfo], header: usize, end: usize) -> String {
        let Some(first) = (header + 1..=end).find(|&i| !infos[i].blank) else {
            return String::new();
        };
        let trimmed = lines[first].trim();
        let Some(mark) = ["\"\"\"", "'''"].into_iter().find(|m| trimmed.starts_with(m)) else {
            return String::new();
        };
        let after = &trimmed[3..];
        if let Some(close) = after.find(mark) {
            return after[..close].trim().to_string();
        }
        let mut text = vec![after.to_string()];
        for line in lines.iter().take(end + 1).skip(first + 1) {
            match line.find(mark) {
                Some(close) => {
                    text.push(line[..close].to_string());
                    break;
                }
                None => text.push(line.to_string()),
            }
        }
        text.iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

impl SourceParser for IndentParser {
    fn conventions(&self) -> LanguageConventions {
        PYTHON_CONVENTIONS
    }

    fn parse(&self, source: &str) -> ParseResult<RawFile> {
        let (infos, balanced) = scan_lines(source);
        if !balanced || !structure_is_valid(source, &infos) {
            return Ok(RawFile::invalid());
        }

        let lines: Vec<&str> = source.split('\n').collect();
        let mut raw = RawFile {
            valid: true,
            ..RawFile::default()
        };
        // (name, is_class, indent)
        let mut scopes: Vec<(String, bool, usize)> = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            let info = infos[index];
            if info.blank || info.in_string {
                continue;
            }
            while scopes.last().is_some_and(|(_, _, indent)| *indent >= info.indent) {
                scopes.pop();
            }
            let trimmed = line.trim();
            let line_no = index as u32 + 1;

            if let Some(rest) = trimmed.strip_prefix("raise ") {
                raw.exceptions.push(RawException {
                    name: Some(header_name_dotted(rest)),
                    alias: None,
                    start_line: Some(line_no),
                    end_line: Some(line_no),
                });
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("except ") {
                if let Some((name, alias)) = rest.trim_end_matches(':').split_once(" as ") {
                    raw.exceptions.push(RawException {
                        name: Some(name.trim().to_string()),
                        alias: Some(alias.trim().to_string()),
                        start_line: Some(line_no),
                        end_line: Some(line_no),
                    });
                }
                continue;
            }

            let Some(keyword) = header_keyword(trimmed) else {
                continue;
            };

            let end = (index + 1..lines.len())
                .take_while(|&j| infos[j].blank || infos[j].in_string || infos[j].indent > info.indent)
                .filter(|&j| !infos[j].blank || infos[j].in_string)
                .last()
                .unwrap_or(index);
            let context: Vec<String> = scopes.iter().map(|(name, _, _)| name.clone()).collect();
            let documentation = Self::docstring(&lines, &infos, index, end);

            if keyword == "class" {
                let rest = &trimmed["class ".len()..];
                let name = header_name(rest);
                let head = rest.split(':').next().unwrap_or_default();
                let bases = between_parens(head)
                    .map(|inner| split_top_level(inner, ','))
                    .unwrap_or_default();

                let body_indent = (index + 1..=end)
                    .find(|&j| !infos[j].blank && !infos[j].in_string)
                    .map(|j| infos[j].indent);
                let class_variables = (index + 1..=end)
                    .filter(|&j| Some(infos[j].indent) == body_indent && !infos[j].in_string)
                    .filter_map(|j| {
                        let stmt = lines[j].trim();
                        let (target, _) = stmt.split_once('=')?;
                        let target = target.split(':').next()?.trim();
                        (!target.is_empty() && target.chars().all(|c| c.is_alphanumeric() || c == '_'))
                            .then(|| RawVariable {
                                name: Some(target.to_string()),
                            })
                    })
                    .collect();

                raw.classes.push(RawClass {
                    name: Some(name.clone()),
                    start_line: Some(line_no),
                    end_line: Some(end as u32 + 1),
                    documentation: Some(documentation),
                    inheritance: Some(bases),
                    class_variables: Some(class_variables),
                    instance_variables: Some(Vec::new()),
                    context: Some(context),
                });
                scopes.push((name, true, info.indent));
            } else {
                let rest = trimmed.trim_start_matches("async ").trim_start_matches("def ");
                let name = header_name(rest);
                let owner = match scopes.last() {
                    Some((owner, true, _)) => owner.clone(),
                    _ => String::new(),
                };
                let parameters = between_parens(rest)
                    .map(|inner| split_top_level(inner, ','))
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|p| parse_parameter(p))
                    .collect();
                let returns = rest
                    .rsplit_once("->")
                    .map(|(_, ret)| ret.trim().trim_end_matches(':').trim().to_string());

                raw.functions.push(RawFunction {
                    name: Some(name.clone()),
                    start_line: Some(line_no),
                    end_line: Some(end as u32 + 1),
                    parameters: Some(parameters),
                    returns,
                    owner: Some(owner),
                    documentation: Some(documentation),
                    context: Some(context),
                });
                scopes.push((name, false, info.indent));
            }
        }

        Ok(raw)
    }
}

fn header_name_dotted(rest: &str) -> String {
    rest.chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '.')
        .collect()
}

// ============================================================================
// Toolkits
// ============================================================================

/// Table-driven NL toolkit.
///
/// Segmentation splits on `_` and lower-to-upper case changes and lowercases
/// every word. Spell correction is the identity. Untagged words are tagged
/// `X`/`dep`. Unmapped stems are the word itself.
#[derive(Debug, Clone, Default)]
pub struct FakeToolkit {
    tags: HashMap<String, (String, String)>,
    verbs: HashSet<String>,
    stems: HashMap<String, String>,
}

impl FakeToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, word: &str, pos_tag: &str, role: &str) -> Self {
        self.tags
            .insert(word.to_string(), (pos_tag.to_string(), role.to_string()));
        self
    }

    pub fn verb(mut self, word: &str) -> Self {
        self.verbs.insert(word.to_string());
        self
    }

    pub fn stem(mut self, word: &str, stem: &str) -> Self {
        self.stems.insert(word.to_string(), stem.to_string());
        self
    }
}

impl NlToolkit for FakeToolkit {
    fn segment(&self, identifier: &str) -> ToolkitResult<Vec<String>> {
        let mut words = Vec::new();
        let mut current = String::new();
        let mut previous_lower = false;
        for ch in identifier.chars() {
            if ch == '_' {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
                previous_lower = false;
                continue;
            }
            if ch.is_uppercase() && previous_lower && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
            current.extend(ch.to_lowercase());
        }
        if !current.is_empty() {
            words.push(current);
        }
        Ok(words)
    }

    fn spell_correct(&self, words: &[String]) -> ToolkitResult<Vec<String>> {
        Ok(words.to_vec())
    }

    fn pos_dependency_tag(&self, phrase: &str) -> ToolkitResult<Vec<TaggedToken>> {
        Ok(phrase
            .split_whitespace()
            .map(|word| match self.tags.get(word) {
                Some((pos, role)) => TaggedToken::new(word, pos.as_str(), role.as_str()),
                None => TaggedToken::new(word, "X", "dep"),
            })
            .collect())
    }

    fn stem(&self, words: &[String]) -> ToolkitResult<Vec<String>> {
        Ok(words
            .iter()
            .map(|w| self.stems.get(w).cloned().unwrap_or_else(|| w.clone()))
            .collect())
    }

    fn known_verbs(&self) -> &HashSet<String> {
        &self.verbs
    }
}

/// NL toolkit whose every request fails.
#[derive(Debug, Clone, Default)]
pub struct FailingToolkit {
    verbs: HashSet<String>,
}

impl FailingToolkit {
    fn fail<T>(op: &str) -> ToolkitResult<T> {
        Err(ToolkitError::RequestFailed {
            op: op.to_string(),
            message: "toolkit offline".to_string(),
        })
    }
}

impl NlToolkit for FailingToolkit {
    fn segment(&self, _identifier: &str) -> ToolkitResult<Vec<String>> {
        Self::fail("segment")
    }

    fn spell_correct(&self, _words: &[String]) -> ToolkitResult<Vec<String>> {
        Self::fail("spell_correct")
    }

    fn pos_dependency_tag(&self, _phrase: &str) -> ToolkitResult<Vec<TaggedToken>> {
        Self::fail("pos_tag")
    }

    fn stem(&self, _words: &[String]) -> ToolkitResult<Vec<String>> {
        Self::fail("stem")
    }

    fn known_verbs(&self) -> &HashSet<String> {
        &self.verbs
    }
}

// ============================================================================
// Tests
// ============================================================================
