//! Python language support for tugdoc.
//!
//! This crate provides the Python-specific half of the tool:
//! - JSON-lines worker process management
//! - `ast`-based source parser
//! - NL toolkit service shared by all file workers
//! - Docstring template generation and splicing
//! - Formatter and import-sorter drivers
//! - The per-file documentation pipeline

pub mod docstring;
pub mod format;
pub mod nlp;
pub mod parser;
pub mod pipeline;
pub mod splice;
pub mod test_helpers;
pub mod worker;
