//! tugdoc: docstring templates for undocumented Python code.
//!
//! Scans a Python source tree, finds classes, functions and methods without
//! a docstring, and writes a Sphinx-style template into each one for a human
//! to complete. Files are only written back when they still parse.

// Core infrastructure - re-exported from tugdoc-core
pub use tugdoc_core::config;
pub use tugdoc_core::error;

// Front door
pub mod cli;
pub mod output;
