//! Sphinx-style docstring templates.
//!
//! [`DocstringGenerator::generate`] turns one undocumented [`CodeElement`]
//! into a complete, delimited docstring block. Every field the generator
//! cannot fill in carries the placeholder [`PLACEHOLDER`] for a human to
//! complete.
//!
//! Output for a method, at body depth 2:
//!
//! ```text
//! \t\t"""
//! \t\tThis method is for computing the total. It is a class method of Cart.
//!
//! \t\t:param tax: XXX. (Default=0.2)
//! \t\t:type tax: float
//! \t\t:returns: float - XXX
//! \t\t"""
//! ```
//!
//! Descriptions come from fixed tables (name prefixes and special methods)
//! or, when an [`NlToolkit`] is supplied, from the tagged identifier.
//! Toolkit failures fall back to the placeholder sentence.

use tracing::warn;

use tugdoc_core::adapter::{LanguageConventions, NlToolkit, TaggedToken, ToolkitResult};
use tugdoc_core::element::{CodeElement, Parameter};

/// Text a human has to replace.
pub const PLACEHOLDER: &str = "XXX";

/// Opening and closing delimiter line.
pub const DELIMITER: &str = "\"\"\"";

const CLASS_PLACEHOLDER: &str = "This class XXX .";
const METHOD_PLACEHOLDER: &str = "This method is XXX .";

/// Sentences for names starting with a short verb alias.
const PREFIX_SENTENCES: &[(&str, &str)] = &[
    ("get", "This is a getter method."),
    ("add", "This is an adder method."),
    ("set", "This is a setter method."),
];

/// Sentences for special method names.
const SPECIAL_METHOD_SENTENCES: &[(&str, &str)] = &[
    ("__init__", "This overrides the built-in object Initializator."),
    ("__del__", "This overrides the built-in object Destructor."),
    ("__new__", "This overrides the built-in object Constructor."),
    ("__repr__", "This overrides the built-in (Formal) String representation of the object."),
    ("__str__", "This overrides the built-in (Informal) String representation of the object."),
    ("__format__", "This overrides the built-in Formatted string representation of the object."),
    ("__bytes__", "This overrides the built-in Bytes representation of the object."),
    ("__bool__", "This overrides the built-in Boolean representation of the object."),
    ("__hash__", "This overrides the built-in Hash representation of the object."),
    ("__call__", "This overrides the built-in behaviour when the object is called like a function."),
    ("__lt__", "This describes how the object behaves when the Less Than operation is performed with it."),
    ("__le__", "This describes how the object behaves when the Less or Equal operation is performed with it."),
    ("__eq__", "This describes how the object behaves when the Equal operation is performed with it."),
    ("__ne__", "This describes how the object behaves when the Not Equal operation is performed with it."),
    ("__gt__", "This describes how the object behaves when the Greater Than operation is performed with it."),
    ("__ge__", "This describes how the object behaves when the Greater or Equal operation is performed with it."),
    ("__mul__", "This describes how the object behaves when the multiplication operation is performed with it."),
    ("__add__", "This describes how the object behaves when the sum operation is performed with it."),
    ("__div__", "This describes how the object behaves when the division operation is performed with it."),
    ("__sub__", "This describes how the object behaves when the subtraction operation is performed with it."),
    ("__iter__", "This defines how to iterate through the object, when an iteration operation is performed on it."),
    ("__next__", "This defines how to retrieve the next element when iterating through the object."),
    ("__len__", "This overrides the built-in Length representation of the object."),
    ("__contains__", "This overrides the representation of the elements contained in the object."),
    ("__copy__", "This overrides the Copy operation of the current object."),
];

/// Type hints whose defaults are rendered quoted.
const STRING_TYPE_HINTS: &[&str] = &["str", "builtins.str"];

/// Fixed sentence for a name starting with a recognized alias.
pub fn prefix_sentence(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    PREFIX_SENTENCES
        .iter()
        .find(|(prefix, _)| lower.starts_with(prefix))
        .map(|(_, sentence)| *sentence)
}

/// Fixed sentence for a special method name.
pub fn special_method_sentence(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    SPECIAL_METHOD_SENTENCES
        .iter()
        .find(|(special, _)| *special == lower)
        .map(|(_, sentence)| *sentence)
}

/// `an` iff `word` starts with a vowel letter, otherwise `a`.
pub fn indefinite_article(word: &str) -> &'static str {
    match word.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Builds docstring blocks for one file's elements.
#[derive(Clone, Copy)]
pub struct DocstringGenerator<'a> {
    conventions: LanguageConventions,
    toolkit: Option<&'a dyn NlToolkit>,
}

impl<'a> DocstringGenerator<'a> {
    /// A generator; `toolkit: None` disables NL descriptions.
    pub fn new(conventions: LanguageConventions, toolkit: Option<&'a dyn NlToolkit>) -> Self {
        DocstringGenerator { conventions, toolkit }
    }

    /// The full delimited block for `element`, one entry per line.
    pub fn generate(&self, element: &CodeElement) -> Vec<String> {
        let indent = "\t".repeat(element.body_depth());
        let body = if element.is_class() {
            self.class_body(element)
        } else {
            self.function_body(element)
        };

        let mut block = Vec::with_capacity(body.len() + 2);
        block.push(format!("{indent}{DELIMITER}"));
        block.extend(body.into_iter().map(|line| {
            if line.is_empty() {
                line
            } else {
                format!("{indent}{line}")
            }
        }));
        block.push(format!("{indent}{DELIMITER}"));
        block
    }

    // ------------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------------

    fn class_body(&self, class: &CodeElement) -> Vec<String> {
        let mut sections: Vec<Vec<String>> = vec![vec![self.describe_class(&class.name)]];

        match class.inheritance.as_slice() {
            [] => {}
            [base] => sections.push(vec![format!("Extends class {}.", base)]),
            bases => sections.push(vec![format!("Extends classes {}.", bases.join(", "))]),
        }

        if !class.methods.is_empty() {
            let mut block = vec!["Methods:".to_string()];
            block.extend(
                class
                    .methods
                    .iter()
                    .map(|m| format!(":method {}: {}", m, PLACEHOLDER)),
            );
            sections.push(block);
        }

        if !class.class_variables.is_empty() {
            let mut block = vec!["Attributes:".to_string()];
            block.extend(
                class
                    .class_variables
                    .iter()
                    .map(|v| format!(":ivar {}: {}", v.name, PLACEHOLDER)),
            );
            sections.push(block);
        }

        if let Some(constructor) = &class.constructor {
            let block = if constructor.is_documented() {
                constructor
                    .documentation
                    .trim()
                    .lines()
                    .map(|line| line.trim().to_string())
                    .collect()
            } else {
                self.parameter_block(constructor)
            };
            if !block.is_empty() {
                sections.push(block);
            }
        }

        join_sections(sections)
    }

    fn describe_class(&self, name: &str) -> String {
        let Some(toolkit) = self.toolkit else {
            return CLASS_PLACEHOLDER.to_string();
        };
        match tag_identifier(toolkit, name) {
            Ok(tokens) if !tokens.is_empty() => class_sentence(&tokens),
            Ok(_) => CLASS_PLACEHOLDER.to_string(),
            Err(err) => {
                warn!(element = name, error = %err, "NL toolkit failed, using placeholder");
                CLASS_PLACEHOLDER.to_string()
            }
        }
    }

    // ------------------------------------------------------------------------
    // Functions and methods
    // ------------------------------------------------------------------------

    fn function_body(&self, function: &CodeElement) -> Vec<String> {
        let mut sentences = Vec::new();
        if let Some(sentence) = prefix_sentence(&function.name) {
            sentences.push(sentence.to_string());
        }
        match special_method_sentence(&function.name) {
            Some(sentence) => sentences.push(sentence.to_string()),
            None => sentences.push(self.describe_function(&function.name)),
        }
        sentences.push(self.scope_qualifier(function));

        let mut fields = self.parameter_block(function);
        if let Some(returns) = &function.return_type_hint {
            fields.push(format!(":returns: {} - {}", returns, PLACEHOLDER));
        }
        fields.extend(
            function
                .exceptions
                .iter()
                .map(|e| format!(":raises {}: {}", e.display_name(), PLACEHOLDER)),
        );

        join_sections(vec![vec![sentences.join(" ")], fields])
    }

    fn describe_function(&self, name: &str) -> String {
        let Some(toolkit) = self.toolkit else {
            return METHOD_PLACEHOLDER.to_string();
        };
        match function_sentence(toolkit, name) {
            Ok(Some(sentence)) => sentence,
            Ok(None) => METHOD_PLACEHOLDER.to_string(),
            Err(err) => {
                warn!(element = name, error = %err, "NL toolkit failed, using placeholder");
                METHOD_PLACEHOLDER.to_string()
            }
        }
    }

    fn scope_qualifier(&self, function: &CodeElement) -> String {
        if !function.is_method() {
            return "It is a global method.".to_string();
        }
        let is_static = function
            .parameters
            .first()
            .is_none_or(|p| p.name != self.conventions.receiver_name);
        format!(
            "It is a {}class method of {}.",
            if is_static { "static " } else { "" },
            function.owner
        )
    }

    /// `:param`/`:type` lines, skipping a leading receiver parameter.
    fn parameter_block(&self, function: &CodeElement) -> Vec<String> {
        let skip = usize::from(
            function
                .parameters
                .first()
                .is_some_and(|p| p.name == self.conventions.receiver_name),
        );
        function
            .parameters
            .iter()
            .skip(skip)
            .flat_map(parameter_lines)
            .collect()
    }
}

fn parameter_lines(param: &Parameter) -> Vec<String> {
    let mut entry = format!(":param {}: {}", param.name, PLACEHOLDER);
    if let Some(default) = &param.default_value {
        let quoted = param
            .type_hint
            .as_deref()
            .is_some_and(|hint| STRING_TYPE_HINTS.contains(&hint.trim()));
        if quoted {
            entry.push_str(&format!(". (Default=\"{}\")", default));
        } else {
            entry.push_str(&format!(". (Default={})", default));
        }
    }

    let mut lines = vec![entry];
    if let Some(hint) = param.type_hint.as_deref().filter(|h| !h.trim().is_empty()) {
        lines.push(format!(":type {}: {}", param.name, hint));
    }
    lines
}

/// Non-empty sections separated by one blank line.
fn join_sections(sections: Vec<Vec<String>>) -> Vec<String> {
    let mut out = Vec::new();
    for section in sections.into_iter().filter(|s| !s.is_empty()) {
        if !out.is_empty() {
            out.push(String::new());
        }
        out.extend(section);
    }
    out
}

// ============================================================================
// NL descriptions
// ============================================================================

/// Segment, spell-correct and tag an identifier.
fn tag_identifier(toolkit: &dyn NlToolkit, identifier: &str) -> ToolkitResult<Vec<TaggedToken>> {
    let words = toolkit.segment(identifier)?;
    let corrected = toolkit.spell_correct(&words)?;
    toolkit.pos_dependency_tag(&corrected.join(" "))
}

fn words_of(tokens: &[TaggedToken]) -> String {
    tokens
        .iter()
        .map(|t| t.word.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// "This class represents ..." for a tagged class name.
fn class_sentence(tokens: &[TaggedToken]) -> String {
    let has_noun = tokens.iter().any(|t| t.pos_tag == "NOUN");
    let roots: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.role == "ROOT")
        .map(|(i, _)| i)
        .collect();

    if has_noun && roots.len() == 1 && tokens.len() > 1 {
        let root = roots[0];
        let others: Vec<TaggedToken> = tokens
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != root)
            .map(|(_, t)| t.clone())
            .collect();
        format!(
            "This class represents the/a {} of {}s.",
            tokens[root].word,
            words_of(&others)
        )
    } else {
        format!("This class represents {}s.", words_of(tokens))
    }
}

/// Generic-tier sentence for a function name; `None` when nothing was tagged.
fn function_sentence(toolkit: &dyn NlToolkit, name: &str) -> ToolkitResult<Option<String>> {
    let tokens = tag_identifier(toolkit, name)?;
    let Some((first, rest)) = tokens.split_first() else {
        return Ok(None);
    };

    if first.pos_tag == "VERB" || toolkit.known_verbs().contains(&first.word) {
        let stem = toolkit
            .stem(std::slice::from_ref(&first.word))?
            .into_iter()
            .next()
            .unwrap_or_else(|| first.word.clone());
        if rest.is_empty() {
            Ok(Some(format!("This method is for {}ing.", stem)))
        } else {
            Ok(Some(format!("This method is for {}ing the {}.", stem, words_of(rest))))
        }
    } else {
        Ok(Some(format!(
            "This method performs {} {}.",
            indefinite_article(&first.word),
            words_of(&tokens)
        )))
    }
}

// ============================================================================
// Tests
// ============================================================================
