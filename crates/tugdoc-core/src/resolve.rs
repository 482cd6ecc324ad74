//! Relationship resolution between normalized elements.
//!
//! - Classes collect the names of the methods they own, in parser order,
//!   de-duplicated by name
//! - Classes find their initializer by exact owner + name match
//! - Functions collect the exception records strictly inside their range
//!
//! [`elements_to_document`] then produces the processing order used by the
//! splicer: descending start line, first element per start line wins,
//! documented elements skipped.

use std::collections::HashSet;

use tracing::debug;

use crate::adapter::LanguageConventions;
use crate::element::{CodeElement, ExceptionRecord};
use crate::normalize::NormalizedFile;

/// Elements of one file with their relationships attached.
#[derive(Debug, Clone, Default)]
pub struct ResolvedFile {
    pub classes: Vec<CodeElement>,
    pub functions: Vec<CodeElement>,
    pub exceptions: Vec<ExceptionRecord>,
}

/// Attach methods, constructors and exceptions.
pub fn resolve(file: NormalizedFile, conventions: &LanguageConventions) -> ResolvedFile {
    let NormalizedFile {
        mut classes,
        mut functions,
        exceptions,
        ..
    } = file;

    for function in &mut functions {
        function.exceptions = exceptions_within(function, &exceptions);
    }

    for class in &mut classes {
        class.methods = collect_class_methods(&class.name, &functions);
        class.constructor = find_constructor(&class.name, &functions, conventions.initializer_name)
            .map(|ctor| Box::new(ctor.clone()));
        debug!(
            class = %class.name,
            methods = class.methods.len(),
            has_constructor = class.constructor.is_some(),
            "resolved class"
        );
    }

    ResolvedFile {
        classes,
        functions,
        exceptions,
    }
}

/// Names of the functions owned by `class_name`, parser order, unique.
pub fn collect_class_methods(class_name: &str, functions: &[CodeElement]) -> Vec<String> {
    let mut seen = HashSet::new();
    functions
        .iter()
        .filter(|f| f.owner == class_name)
        .filter(|f| seen.insert(f.name.clone()))
        .map(|f| f.name.clone())
        .collect()
}

/// The first function owned by `class_name` named `initializer`.
pub fn find_constructor<'a>(
    class_name: &str,
    functions: &'a [CodeElement],
    initializer: &str,
) -> Option<&'a CodeElement> {
    functions
        .iter()
        .find(|f| f.owner == class_name && f.name == initializer)
}

/// Exception records strictly contained in the function's line range.
pub fn exceptions_within(function: &CodeElement, exceptions: &[ExceptionRecord]) -> Vec<ExceptionRecord> {
    exceptions
        .iter()
        .filter(|e| e.is_strictly_within(function.start_line, function.end_line))
        .cloned()
        .collect()
}

/// Undocumented elements in splice order.
///
/// Classes and functions are merged and stably sorted by descending start
/// line. Of several elements sharing a start line only the first in that
/// order is considered, documented or not; the rest are parser duplicates.
pub fn elements_to_document(file: &ResolvedFile) -> Vec<&CodeElement> {
    let mut ordered: Vec<&CodeElement> = file.classes.iter().chain(file.functions.iter()).collect();
    ordered.sort_by(|a, b| b.start_line.cmp(&a.start_line));

    let mut seen_lines = HashSet::new();
    ordered
        .into_iter()
        .filter(|element| {
            let first = seen_lines.insert(element.start_line);
            if !first {
                debug!(element = %element.qualified_name(), line = element.start_line, "skipping duplicate start line");
            }
            first
        })
        .filter(|element| !element.is_documented())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementKind, Parameter};

    const CONVENTIONS: LanguageConventions = LanguageConventions {
        initializer_name: "__init__",
        receiver_name: "self",
        extension: "py",
    };

    fn method(owner: &str, name: &str, start: u32, end: u32) -> CodeElement {
        let mut element = CodeElement::new(name, ElementKind::ClassMethod, start, end);
        element.owner = owner.to_string();
        element.enclosing_context = vec![owner.to_string()];
        element
    }

    fn exception(name: &str, start: u32, end: u32) -> ExceptionRecord {
        ExceptionRecord {
            exception_name: name.to_string(),
            alias: None,
            start_line: start,
            end_line: end,
        }
    }

    #[test]
    fn methods_are_unique_and_ordered() {
        let functions = vec![
            method("Shape", "area", 2, 3),
            method("Other", "area", 6, 7),
            method("Shape", "perimeter", 4, 5),
            method("Shape", "area", 8, 9),
        ];
        assert_eq!(
            collect_class_methods("Shape", &functions),
            vec!["area".to_string(), "perimeter".to_string()]
        );
    }

    #[test]
    fn constructor_requires_owner_and_name() {
        let mut ctor = method("Ball", "__init__", 2, 4);
        ctor.parameters = vec![Parameter::named("self"), Parameter::named("radius")];
        let functions = vec![method("Other", "__init__", 10, 12), ctor];

        let found = find_constructor("Ball", &functions, "__init__").unwrap();
        assert_eq!(found.start_line, 2);
        assert!(find_constructor("Missing", &functions, "__init__").is_none());
    }

    #[test]
    fn exception_on_method_boundary_is_excluded() {
        let function = method("A", "run", 5, 10);
        let exceptions = vec![
            exception("AtStart", 5, 5),
            exception("Inside", 7, 7),
            exception("AtEnd", 10, 10),
            exception("Outside", 12, 12),
        ];
        let attached = exceptions_within(&function, &exceptions);
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].exception_name, "Inside");
    }

    #[test]
    fn resolve_attaches_relationships() {
        let class = CodeElement::new("Ball", ElementKind::Class, 1, 10);
        let mut ctor = method("Ball", "__init__", 2, 6);
        ctor.documentation = "Build a ball.".to_string();
        let normalized = NormalizedFile {
            classes: vec![class],
            functions: vec![ctor, method("Ball", "bounce", 7, 10)],
            exceptions: vec![exception("ValueError", 4, 4)],
            dropped: 0,
        };

        let resolved = resolve(normalized, &CONVENTIONS);
        let ball = &resolved.classes[0];
        assert_eq!(ball.methods, vec!["__init__".to_string(), "bounce".to_string()]);
        let ctor = ball.constructor.as_ref().unwrap();
        assert_eq!(ctor.documentation, "Build a ball.");
        assert_eq!(resolved.functions[0].exceptions.len(), 1);
        assert!(resolved.functions[1].exceptions.is_empty());
    }

    #[test]
    fn processing_order_is_descending() {
        let resolved = ResolvedFile {
            classes: vec![CodeElement::new("A", ElementKind::Class, 5, 30)],
            functions: vec![
                CodeElement::new("f", ElementKind::Function, 40, 45),
                method("A", "g", 20, 25),
            ],
            exceptions: vec![],
        };
        let lines: Vec<u32> = elements_to_document(&resolved)
            .iter()
            .map(|e| e.start_line)
            .collect();
        assert_eq!(lines, vec![40, 20, 5]);
    }

    #[test]
    fn duplicate_start_lines_yield_one_element() {
        let resolved = ResolvedFile {
            classes: vec![CodeElement::new("A", ElementKind::Class, 3, 3)],
            functions: vec![method("A", "f", 3, 3)],
            exceptions: vec![],
        };
        let elements = elements_to_document(&resolved);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].name, "A");
    }

    #[test]
    fn documented_duplicate_still_suppresses_later_ones() {
        let mut documented = CodeElement::new("A", ElementKind::Class, 3, 3);
        documented.documentation = "Existing.".to_string();
        let resolved = ResolvedFile {
            classes: vec![documented],
            functions: vec![method("A", "f", 3, 3)],
            exceptions: vec![],
        };
        assert!(elements_to_document(&resolved).is_empty());
    }
}
