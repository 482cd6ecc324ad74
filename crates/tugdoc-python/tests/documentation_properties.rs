//! Whole-file documentation properties.
//!
//! These tests drive [`FilePipeline`] and the splicing primitives on real
//! files in temporary directories. Most use the interpreter-free
//! [`IndentParser`]; the tests at the bottom run the embedded `ast` worker
//! and skip when no Python interpreter is available.
//!
//! # Running These Tests
//!
//! ```bash
//! cargo nextest run -p tugdoc-python documentation_properties
//! ```

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use tugdoc_core::adapter::{RawFile, RawFunction, SourceParser};
use tugdoc_core::config::Config;
use tugdoc_core::normalize::normalize;
use tugdoc_core::resolve::{elements_to_document, resolve};
use tugdoc_core::text::SourceText;
use tugdoc_python::docstring::DocstringGenerator;
use tugdoc_python::parser::{PythonAstParser, PYTHON_CONVENTIONS};
use tugdoc_python::pipeline::{FailureReason, FilePipeline, FileStatus};
use tugdoc_python::splice::splice_docstring;
use tugdoc_python::test_helpers::{find_python, FakeToolkit, IndentParser, StaticParser};

fn write(temp: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = temp.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Trimmed lines of a file, for position-independent assertions.
fn trimmed_lines(content: &str) -> Vec<String> {
    content.lines().map(|l| l.trim().to_string()).collect()
}

fn ball_toolkit() -> FakeToolkit {
    FakeToolkit::new()
        .tag("round", "ADJ", "amod")
        .tag("ball", "NOUN", "ROOT")
        .tag("compute", "VERB", "ROOT")
        .tag("area", "NOUN", "dobj")
        .stem("compute", "comput")
}

const ROUND_BALL: &str = "class RoundBall:\n\
                          \x20   def __init__(self, radius):\n\
                          \x20       self.radius = radius\n\
                          \n\
                          \x20   def compute_area(self):\n\
                          \x20       return 3.14 * self.radius ** 2\n";

// ============================================================================
// Idempotence and non-corruption
// ============================================================================

#[test]
fn documenting_twice_changes_nothing_the_second_time() {
    let temp = TempDir::new().unwrap();
    let path = write(&temp, "ball.py", ROUND_BALL);
    let config = Config::default();
    let pipeline = FilePipeline::new(&IndentParser, None, &config);

    let first = pipeline.document_file(&path);
    assert_eq!(first.status, FileStatus::Documented { inserted: 3 });
    let once = fs::read_to_string(&path).unwrap();

    let second = pipeline.document_file(&path);
    assert_eq!(second.failure(), Some(&FailureReason::NothingToDocument));
    assert_eq!(fs::read_to_string(&path).unwrap(), once);
}

#[test]
fn partially_documented_file_only_gains_missing_docstrings() {
    let temp = TempDir::new().unwrap();
    let source = "def documented():\n\
                  \x20   \"\"\"Already here.\"\"\"\n\
                  \x20   return 1\n\
                  \n\
                  def bare():\n\
                  \x20   return 2\n";
    let path = write(&temp, "mixed.py", source);
    let config = Config::default();
    let pipeline = FilePipeline::new(&IndentParser, None, &config);

    assert_eq!(
        pipeline.document_file(&path).status,
        FileStatus::Documented { inserted: 1 }
    );
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("def documented():\n    \"\"\"Already here.\"\"\"\n    return 1\n"));
    assert_eq!(content.matches("It is a global method.").count(), 1);
}

#[test]
fn rejected_result_leaves_file_byte_identical() {
    let temp = TempDir::new().unwrap();
    let source = "def f():\r\n    return 1\r\n\t\n";
    let path = write(&temp, "crlf.py", source);
    let raw = RawFile {
        valid: true,
        functions: vec![RawFunction {
            name: Some("f".to_string()),
            start_line: Some(1),
            end_line: Some(2),
            ..RawFunction::default()
        }],
        ..RawFile::default()
    };
    let parser = StaticParser::new(raw).rejecting("XXX");
    let config = Config::default();

    let outcome = FilePipeline::new(&parser, None, &config).document_file(&path);
    assert_eq!(outcome.failure(), Some(&FailureReason::ValidationFailed));
    assert_eq!(fs::read(&path).unwrap(), source.as_bytes());
}

// ============================================================================
// Splice ordering
// ============================================================================

/// Splice every element of `source` in the given order.
fn splice_in_order(source: &str, ascending: bool) -> String {
    let raw = IndentParser.parse(source).unwrap();
    let resolved = resolve(normalize(&raw), &PYTHON_CONVENTIONS);
    let mut elements = elements_to_document(&resolved);
    if ascending {
        elements.reverse();
    }
    let generator = DocstringGenerator::new(PYTHON_CONVENTIONS, None);
    let mut text = SourceText::new(source);
    for element in elements {
        splice_docstring(
            &mut text,
            element.start_line,
            element.end_line,
            &generator.generate(element),
        );
    }
    text.to_text()
}

fn line_after<'a>(content: &'a str, line: &str) -> Option<&'a str> {
    let mut lines = content.split('\n');
    lines.by_ref().find(|l| *l == line)?;
    lines.next()
}

#[test]
fn descending_order_places_every_docstring_under_its_signature() {
    let source = "class Cart:\n    def total(self):\n        return 0\n";
    let spliced = splice_in_order(source, false);
    assert_eq!(line_after(&spliced, "class Cart:"), Some("\t\"\"\""));
    assert_eq!(line_after(&spliced, "    def total(self):"), Some("\t\t\"\"\""));
}

#[test]
fn ascending_order_misplaces_later_docstrings() {
    let source = "class Cart:\n    def total(self):\n        return 0\n";
    let spliced = splice_in_order(source, true);
    // The class block shifted the method down; its old line range now falls
    // inside the class docstring, which has no signature line.
    assert_eq!(line_after(&spliced, "    def total(self):"), Some("        return 0"));
    assert_ne!(spliced, splice_in_order(source, false));
}

// ============================================================================
// Resolution rules seen through the output
// ============================================================================

#[test]
fn exceptions_attach_only_to_the_enclosing_function() {
    let temp = TempDir::new().unwrap();
    let source = "def load(path):\n\
                  \x20   try:\n\
                  \x20       return open(path)\n\
                  \x20   except OSError as err:\n\
                  \x20       raise LoadError(path)\n\
                  \x20   return None\n\
                  \n\
                  def save(path):\n\
                  \x20   raise NotImplementedError\n";
    let path = write(&temp, "io.py", source);
    let config = Config::default();
    FilePipeline::new(&IndentParser, None, &config).document_file(&path);

    let lines = trimmed_lines(&fs::read_to_string(&path).unwrap());
    let raises: Vec<&String> = lines.iter().filter(|l| l.starts_with(":raises")).collect();
    assert_eq!(
        raises,
        vec![":raises OSError as err: XXX", ":raises LoadError: XXX"]
    );
}

#[test]
fn duplicate_start_lines_produce_one_docstring() {
    let temp = TempDir::new().unwrap();
    let path = write(&temp, "dup.py", "def f():\n    return 1\n");
    let record = |name: &str, documentation: &str| RawFunction {
        name: Some(name.to_string()),
        start_line: Some(1),
        end_line: Some(2),
        documentation: Some(documentation.to_string()),
        ..RawFunction::default()
    };
    let config = Config::default();

    let raw = RawFile {
        valid: true,
        functions: vec![record("f", ""), record("g", "")],
        ..RawFile::default()
    };
    let parser = StaticParser::new(raw);
    let outcome = FilePipeline::new(&parser, None, &config).document_file(&path);
    assert_eq!(outcome.status, FileStatus::Documented { inserted: 1 });
    assert_eq!(fs::read_to_string(&path).unwrap().matches("\"\"\"").count(), 2);

    // A documented record shadows an undocumented one on the same line.
    let path = write(&temp, "shadow.py", "def f():\n    return 1\n");
    let raw = RawFile {
        valid: true,
        functions: vec![record("f", "Doc."), record("g", "")],
        ..RawFile::default()
    };
    let parser = StaticParser::new(raw);
    let outcome = FilePipeline::new(&parser, None, &config).document_file(&path);
    assert_eq!(outcome.failure(), Some(&FailureReason::NothingToDocument));
}

#[test]
fn static_and_instance_methods_are_qualified() {
    let temp = TempDir::new().unwrap();
    let source = "class Registry:\n\
                  \x20   def make():\n\
                  \x20       return Registry()\n\
                  \n\
                  \x20   def size(self):\n\
                  \x20       return 0\n";
    let path = write(&temp, "registry.py", source);
    let config = Config::default();
    FilePipeline::new(&IndentParser, None, &config).document_file(&path);

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("This method is XXX . It is a static class method of Registry."));
    assert!(content.contains("This method is XXX . It is a class method of Registry."));
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn round_ball_with_nl_enrichment() {
    let temp = TempDir::new().unwrap();
    let path = write(&temp, "ball.py", ROUND_BALL);
    let config = Config::default();
    let toolkit = ball_toolkit();
    FilePipeline::new(&IndentParser, Some(&toolkit), &config).document_file(&path);

    let lines = trimmed_lines(&fs::read_to_string(&path).unwrap());
    assert_eq!(lines[1], "\"\"\"");
    assert_eq!(lines[2], "This class represents the/a ball of rounds.");
    let radius = lines.iter().position(|l| l == ":param radius: XXX").unwrap();
    assert!(radius > 2);
    assert!(lines.contains(
        &"This method is for computing the area. It is a class method of RoundBall.".to_string()
    ));
}

#[test]
fn round_ball_without_nl_enrichment() {
    let temp = TempDir::new().unwrap();
    let path = write(&temp, "ball.py", ROUND_BALL);
    let config = Config::default();
    FilePipeline::new(&IndentParser, None, &config).document_file(&path);

    let lines = trimmed_lines(&fs::read_to_string(&path).unwrap());
    assert_eq!(lines[2], "This class XXX .");
    assert!(lines.iter().skip(3).any(|l| l == ":param radius: XXX"));
    assert!(lines.contains(&"This method is XXX . It is a class method of RoundBall.".to_string()));
}

#[test]
fn get_user_scenario() {
    let temp = TempDir::new().unwrap();
    let path = write(&temp, "users.py", "def get_user(id: int):\n    return id\n");
    let config = Config::default();
    FilePipeline::new(&IndentParser, None, &config).document_file(&path);

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "def get_user(id: int):\n\
         \x20   \"\"\"\n\
         \x20   This is a getter method. This method is XXX . It is a global method.\n\
         \n\
         \x20   :param id: XXX\n\
         \x20   :type id: int\n\
         \x20   \"\"\"\n\
         \n\
         \x20   return id\n"
    );
}

// ============================================================================
// Real interpreter
// ============================================================================

#[test]
fn ast_parser_round_ball_end_to_end() {
    let Some(python) = find_python() else {
        eprintln!("Skipping test: Python not found");
        return;
    };
    let parser = PythonAstParser::new(&python.to_string_lossy()).unwrap();
    let temp = TempDir::new().unwrap();
    let path = write(&temp, "ball.py", ROUND_BALL);
    let config = Config::default();
    let pipeline = FilePipeline::new(&parser, None, &config);

    let outcome = pipeline.document_file(&path);
    assert_eq!(outcome.status, FileStatus::Documented { inserted: 3 });
    let content = fs::read_to_string(&path).unwrap();
    assert!(parser.check_syntax(&content).unwrap());
    let lines = trimmed_lines(&content);
    assert_eq!(lines[2], "This class XXX .");
    assert!(lines.contains(&":param radius: XXX".to_string()));

    let again = pipeline.document_file(&path);
    assert_eq!(again.failure(), Some(&FailureReason::NothingToDocument));
    assert_eq!(fs::read_to_string(&path).unwrap(), content);
}

#[test]
fn ast_parser_handles_decorators_and_nesting() {
    let Some(python) = find_python() else {
        eprintln!("Skipping test: Python not found");
        return;
    };
    let parser = PythonAstParser::new(&python.to_string_lossy()).unwrap();
    let temp = TempDir::new().unwrap();
    let source = "import functools\n\
                  \n\
                  \n\
                  class Shop:\n\
                  \x20   @staticmethod\n\
                  \x20   def open_store(name: str = \"main\"):\n\
                  \x20       def inner():\n\
                  \x20           return name\n\
                  \x20       return inner\n\
                  \n\
                  \x20   @functools.lru_cache\n\
                  \x20   def price(self, item) -> float:\n\
                  \x20       if not item:\n\
                  \x20           raise ValueError(item)\n\
                  \x20       return 1.0\n";
    let path = write(&temp, "shop.py", source);
    let config = Config::default();

    let outcome = FilePipeline::new(&parser, None, &config).document_file(&path);
    assert_eq!(outcome.status, FileStatus::Documented { inserted: 4 });
    let content = fs::read_to_string(&path).unwrap();
    assert!(parser.check_syntax(&content).unwrap());

    let lines = trimmed_lines(&content);
    assert!(lines.contains(&":param name: XXX. (Default=\"main\")".to_string()));
    assert!(lines.contains(&":type name: str".to_string()));
    assert!(lines.contains(&":returns: float - XXX".to_string()));
    assert!(lines.contains(&":raises ValueError: XXX".to_string()));
    assert!(content.contains("            \"\"\"\n            This method is XXX . It is a global method."));
}

#[test]
fn ast_parser_unclosed_string_keeps_following_code() {
    let Some(python) = find_python() else {
        eprintln!("Skipping test: Python not found");
        return;
    };
    let parser = PythonAstParser::new(&python.to_string_lossy()).unwrap();
    let temp = TempDir::new().unwrap();
    let source = "def f():\n\
                  \x20   \"\"\"Doc\n\
                  \x20   more\"\"\" + SUFFIX\n\
                  \x20   important_call()\n\
                  \x20   return 1\n";
    let path = write(&temp, "suffix.py", source);
    let config = Config::default();

    let outcome = FilePipeline::new(&parser, None, &config).document_file(&path);
    assert!(outcome.is_documented());
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with(source));
    assert!(content.contains("important_call()"));
    assert!(content.contains("return 1"));
}

#[test]
fn ast_parser_one_line_definition_does_not_steal_next_docstring() {
    let Some(python) = find_python() else {
        eprintln!("Skipping test: Python not found");
        return;
    };
    let parser = PythonAstParser::new(&python.to_string_lossy()).unwrap();
    let temp = TempDir::new().unwrap();
    let path = write(&temp, "short.py", "def f(a): return a\ndef get_g(b):\n    return b\n");
    let config = Config::default();

    let outcome = FilePipeline::new(&parser, None, &config).document_file(&path);
    assert_eq!(outcome.status, FileStatus::Documented { inserted: 1 });
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("def f(a): return a\ndef get_g(b):\n"));
    let lines = trimmed_lines(&content);
    assert!(lines.contains(&"This is a getter method. This method is XXX . It is a global method.".to_string()));
    assert!(lines.contains(&":param b: XXX".to_string()));
    assert!(!lines.contains(&":param a: XXX".to_string()));
}
