//! Code element model.
//!
//! A [`CodeElement`] is the uniform description of a class, function or
//! method produced by the normalizer and enriched by the resolver. Elements
//! are derived fresh from every parse of a file and are never mutated after
//! resolution: template generation reads them and produces new text.
//!
//! ## Line Conventions
//!
//! - `start_line` and `end_line` are **1-indexed** and inclusive
//! - Both refer to the *original* source text the parser saw

use serde::{Deserialize, Serialize};

// ============================================================================
// Element Kind
// ============================================================================

/// The kind of a code element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// A class definition.
    Class,
    /// A free (module-level or nested) function.
    Function,
    /// A function whose owner is a class.
    ClassMethod,
}

impl ElementKind {
    /// Stable lowercase name, used in logs and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Class => "class",
            ElementKind::Function => "function",
            ElementKind::ClassMethod => "class_method",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Element Parts
// ============================================================================

/// A function parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl Parameter {
    /// Create a parameter with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            type_hint: None,
            default_value: None,
        }
    }

    /// Whether the parameter carries a non-empty type annotation.
    pub fn is_annotated(&self) -> bool {
        self.type_hint.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// A class or instance variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
}

/// A raise site or exception handler reported by the parser.
///
/// Only used to test containment inside a function's line range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub exception_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
}

impl ExceptionRecord {
    /// Whether this record lies strictly inside `[start_line, end_line]`.
    ///
    /// A record touching either boundary line is not contained.
    pub fn is_strictly_within(&self, start_line: u32, end_line: u32) -> bool {
        self.start_line > start_line && self.end_line < end_line
    }

    /// Display name: `Name` or `Name as alias`.
    pub fn display_name(&self) -> String {
        match self.alias.as_deref().filter(|a| !a.is_empty()) {
            Some(alias) => format!("{} as {}", self.exception_name, alias),
            None => self.exception_name.clone(),
        }
    }
}

// ============================================================================
// Code Element
// ============================================================================

/// A class, function or method discovered in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeElement {
    pub name: String,
    pub kind: ElementKind,
    pub start_line: u32,
    pub end_line: u32,
    /// Existing docstring, possibly empty.
    pub documentation: String,
    /// Ancestor scope names, outermost first. Excludes the element itself.
    pub enclosing_context: Vec<String>,
    /// Owning class name for methods, empty otherwise.
    pub owner: String,
    pub parameters: Vec<Parameter>,
    pub return_type_hint: Option<String>,
    /// Base names (classes only).
    pub inheritance: Vec<String>,
    /// Unique method names owned by this class (classes only).
    pub methods: Vec<String>,
    /// The initializer method, when the class defines one (classes only).
    pub constructor: Option<Box<CodeElement>>,
    pub class_variables: Vec<Variable>,
    pub instance_variables: Vec<Variable>,
    /// Exceptions raised or handled strictly inside this function.
    pub exceptions: Vec<ExceptionRecord>,
    pub total_lines: u32,
    pub lines_of_code: u32,
    pub parameter_count: usize,
    pub annotated_parameter_count: usize,
}

impl CodeElement {
    /// Create an element with the required fields; everything else empty.
    pub fn new(name: impl Into<String>, kind: ElementKind, start_line: u32, end_line: u32) -> Self {
        CodeElement {
            name: name.into(),
            kind,
            start_line,
            end_line,
            documentation: String::new(),
            enclosing_context: Vec::new(),
            owner: String::new(),
            parameters: Vec::new(),
            return_type_hint: None,
            inheritance: Vec::new(),
            methods: Vec::new(),
            constructor: None,
            class_variables: Vec::new(),
            instance_variables: Vec::new(),
            exceptions: Vec::new(),
            total_lines: end_line.saturating_sub(start_line) + 1,
            lines_of_code: end_line.saturating_sub(start_line) + 1,
            parameter_count: 0,
            annotated_parameter_count: 0,
        }
    }

    /// An element is undocumented iff its documentation is empty or whitespace.
    pub fn is_documented(&self) -> bool {
        !self.documentation.trim().is_empty()
    }

    pub fn is_class(&self) -> bool {
        self.kind == ElementKind::Class
    }

    pub fn is_method(&self) -> bool {
        self.kind == ElementKind::ClassMethod
    }

    /// Indentation depth of the element's body.
    ///
    /// One level per ancestor scope plus one for the element's own block.
    pub fn body_depth(&self) -> usize {
        self.enclosing_context.len() + 1
    }

    /// Dotted path of the element, e.g. `Outer.Inner.method`.
    pub fn qualified_name(&self) -> String {
        if self.enclosing_context.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.enclosing_context.join("."), self.name)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
