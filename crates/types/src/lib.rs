//! Shared types for the projconf workspace
//!
//! This crate contains the error taxonomy, validation report types and path
//! helpers shared by the aggregator and the inspector binary.

pub mod error;
pub mod report;
pub mod utils;

// Re-export commonly used types
pub use error::{ConfigError, ParseError, Result, SourcePosition, ValidationFailure};
pub use report::{IssueKind, Severity, ValidationIssue, ValidationReport};
