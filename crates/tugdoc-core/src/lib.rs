//! Core infrastructure for tugdoc.
//!
//! This crate provides language-agnostic infrastructure:
//! - Error types and error codes
//! - Configuration loading (`tugdoc.toml`)
//! - The code element model shared by every stage
//! - Parser and NL toolkit adapter contracts
//! - Element normalization and relationship resolution
//! - In-memory source text with line splicing
//! - Source file discovery and tree backup

pub mod adapter;
pub mod backup;
pub mod config;
pub mod element;
pub mod error;
pub mod files;
pub mod normalize;
pub mod resolve;
pub mod text;
