//! Error types for the projconf system

use crate::report::ValidationReport;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Main error type for configuration loading and resolution
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration source could not be read
    #[error("Failed to read configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed; nothing from it is usable
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// One or more sections violate their schema
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// A schema was registered twice for the same namespace
    #[error("A schema is already registered for namespace: {namespace}")]
    DuplicateSchema { namespace: String },

    /// A schema is internally inconsistent
    #[error("Invalid schema for namespace {namespace}: {message}")]
    InvalidSchema { namespace: String, message: String },

    /// A namespace was requested that has no registered schema
    #[error("No schema registered for namespace: {namespace}")]
    UnknownNamespace { namespace: String },

    /// A validated section could not be converted into its typed view
    #[error("Cannot read section {namespace}: {message}")]
    Extract { namespace: String, message: String },

    /// The requested application is not defined in the project
    #[error("Project doesn't define an application named '{name}'")]
    AppNotFound { name: String },

    /// Several applications are defined and none was named
    #[error("Project specifies more than one application; use --app to specify which one to use")]
    AmbiguousApp,

    /// The project defines no applications at all
    #[error("Project doesn't define any applications")]
    NoApps,
}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// A 1-based position inside the configuration source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Syntax error in the configuration document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration parse error{}: {message}", position_suffix(.position))]
pub struct ParseError {
    pub message: String,
    pub position: Option<SourcePosition>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Option<SourcePosition>) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

fn position_suffix(position: &Option<SourcePosition>) -> String {
    match position {
        Some(position) => format!(" at {}", position),
        None => String::new(),
    }
}

/// Composite validation failure covering every section that was checked
#[derive(Error, Debug, Clone)]
#[error("Configuration validation failed: {}\n{}", .report.summary(), .report.render_errors())]
pub struct ValidationFailure {
    pub report: ValidationReport,
}

impl ValidationFailure {
    pub fn new(report: ValidationReport) -> Self {
        Self { report }
    }

    /// Fields of every error, in report order
    pub fn fields(&self) -> Vec<&str> {
        self.report.errors.iter().map(|issue| issue.field.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::IssueKind;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("expected `=`", Some(SourcePosition { line: 3, column: 7 }));
        assert_eq!(
            err.to_string(),
            "Configuration parse error at line 3, column 7: expected `=`"
        );

        let err = ParseError::new("invalid utf-8", None);
        assert_eq!(err.to_string(), "Configuration parse error: invalid utf-8");
    }

    #[test]
    fn test_validation_failure_lists_every_error() {
        let mut report = ValidationReport::new();
        report.add_error(
            "tool.coverage.run.branch",
            IssueKind::TypeMismatch {
                expected: "boolean".to_string(),
                found: "string".to_string(),
            },
        );
        report.add_error("build-system.requires", IssueKind::MissingRequired);

        let err = ConfigError::from(ValidationFailure::new(report));
        let display = err.to_string();
        assert!(display.starts_with("Configuration validation failed: 2 errors"));
        assert!(display.contains("tool.coverage.run.branch: expected boolean, found string"));
        assert!(display.contains("build-system.requires: required key is missing"));
    }

    #[test]
    fn test_app_errors() {
        let err = ConfigError::AppNotFound { name: "helloworld".to_string() };
        assert_eq!(err.to_string(), "Project doesn't define an application named 'helloworld'");
        assert!(ConfigError::AmbiguousApp.to_string().contains("use --app"));
    }
}
