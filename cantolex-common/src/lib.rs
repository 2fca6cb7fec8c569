//! # cantolex Common Library
//!
//! Shared code for the vocabulary consolidation pipeline:
//! - Artifact data models (evidence, lemma groups, vocabulary entries)
//! - Read-only prior-run snapshot with flag/translation lookups
//! - Atomic artifact I/O (write-then-rename)
//! - Configuration loading
//! - Text normalization

pub mod artifact;
pub mod config;
pub mod error;
pub mod models;
pub mod text;

pub use error::{Error, Result};
