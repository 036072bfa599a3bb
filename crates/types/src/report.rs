//! Validation report types

use serde::Serialize;
use std::fmt;

/// How serious a reported issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks resolution
    Error,
    /// Surfaced to the user, resolution continues
    Warning,
    /// Informational, e.g. a default that filled an absent key
    Note,
}

/// What went wrong (or what happened) for a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// The value has the wrong type
    TypeMismatch { expected: String, found: String },
    /// A required key is absent from a present namespace
    MissingRequired,
    /// The key is not declared by the namespace schema
    UnknownKey,
    /// Keys that may not be set together are both set
    MutuallyExclusive { keys: Vec<String> },
    /// A string value is outside its allowed set
    InvalidChoice { value: String, allowed: Vec<String> },
    /// A namespace path exists but does not hold a table
    NotATable { found: String },
    /// An absent key was filled with its documented default
    DefaultApplied { value: String },
    /// A namespace has no registered schema and was preserved as-is
    UnknownNamespace,
    /// Free-form constraint violation
    Invalid { message: String },
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::TypeMismatch { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            IssueKind::MissingRequired => write!(f, "required key is missing"),
            IssueKind::UnknownKey => write!(f, "unknown key"),
            IssueKind::MutuallyExclusive { keys } => {
                write!(f, "mutually exclusive keys set together: {}", keys.join(", "))
            }
            IssueKind::InvalidChoice { value, allowed } => {
                write!(f, "invalid value '{}'; allowed values: {}", value, allowed.join(", "))
            }
            IssueKind::NotATable { found } => write!(f, "expected a table, found {}", found),
            IssueKind::DefaultApplied { value } => write!(f, "missing, using default {}", value),
            IssueKind::UnknownNamespace => {
                write!(f, "no schema registered; preserved without interpretation")
            }
            IssueKind::Invalid { message } => write!(f, "{}", message),
        }
    }
}

/// A single reported issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dotted path of the offending key or namespace
    pub field: String,
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.kind)
    }
}

/// Validation report containing errors, warnings and notes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub notes: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: &str, kind: IssueKind) {
        self.push(field, Severity::Error, kind);
    }

    pub fn add_warning(&mut self, field: &str, kind: IssueKind) {
        self.push(field, Severity::Warning, kind);
    }

    pub fn add_note(&mut self, field: &str, kind: IssueKind) {
        self.push(field, Severity::Note, kind);
    }

    fn push(&mut self, field: &str, severity: Severity, kind: IssueKind) {
        let issue = ValidationIssue {
            field: field.to_string(),
            severity,
            kind,
        };
        match severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
            Severity::Note => self.notes.push(issue),
        }
    }

    /// Append another report after ours, skipping issues already reported
    pub fn merge(&mut self, other: ValidationReport) {
        for issue in other.errors.into_iter().chain(other.warnings).chain(other.notes) {
            let bucket = match issue.severity {
                Severity::Error => &mut self.errors,
                Severity::Warning => &mut self.warnings,
                Severity::Note => &mut self.notes,
            };
            if !bucket.contains(&issue) {
                bucket.push(issue);
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// Every issue for `field`, across all severities
    pub fn issues_for<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .chain(self.notes.iter())
            .filter(move |issue| issue.field == field)
    }

    pub fn summary(&self) -> String {
        format!("{} errors, {} warnings", self.errors.len(), self.warnings.len())
    }

    /// One line per error, in report order
    pub fn render_errors(&self) -> String {
        self.errors
            .iter()
            .map(|issue| format!("  - {}", issue))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
