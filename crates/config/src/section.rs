//! Validated, typed views over a single namespace

use crate::loader::{ConfigurationDocument, Lookup};
use crate::schema::Schema;
use crate::validation::SectionValidator;
use serde::de::DeserializeOwned;
use serde::Serialize;
use toml::{Table, Value};
use types::{utils, ConfigError, IssueKind, Result, ValidationFailure, ValidationReport};

/// Where a section value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Written in the document
    Document,
    /// Filled from the schema default of an absent key
    Default,
    /// Taken from the schema fallback of an absent namespace
    Fallback,
}

/// A single normalized key of a section
#[derive(Debug, Clone, PartialEq)]
pub struct SectionEntry {
    pub key: String,
    pub value: Value,
    pub origin: Origin,
    /// Whether the schema declares this key
    pub declared: bool,
}

/// The validated view of one namespace
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSection {
    namespace: String,
    present: bool,
    entries: Vec<SectionEntry>,
    report: ValidationReport,
}

impl ToolSection {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether the namespace was written in the document
    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entry(key).map(|e| &e.value)
    }

    pub fn origin(&self, key: &str) -> Option<Origin> {
        self.entry(key).map(|e| e.origin)
    }

    fn entry(&self, key: &str) -> Option<&SectionEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn entries(&self) -> &[SectionEntry] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Keys whose value came from a schema default
    pub fn defaulted_keys(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.origin == Origin::Default)
            .map(|e| e.key.as_str())
            .collect()
    }

    /// Keys kept although the schema does not declare them
    pub fn extra_keys(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.declared)
            .map(|e| e.key.as_str())
            .collect()
    }

    /// Advisory issues (warnings and notes) raised while validating
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_str_list(&self, key: &str) -> Option<Vec<&str>> {
        self.get(key)?
            .as_array()?
            .iter()
            .map(Value::as_str)
            .collect()
    }

    /// All values as a table, in section order
    pub fn to_table(&self) -> Table {
        self.entries
            .iter()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    /// Deserialize the section into a typed view
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T> {
        Value::Table(self.to_table())
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Extract {
                namespace: self.namespace.clone(),
                message: e.message().trim().to_string(),
            })
    }
}

/// Validate the namespace `name` of `document` against `schema`
///
/// Fails with a [`ValidationFailure`] listing every violation found in the
/// namespace.
pub fn section(
    document: &ConfigurationDocument,
    name: &str,
    schema: &Schema,
) -> Result<ToolSection> {
    let section = build_section(document, &utils::split_path(name), schema, &[]);
    if section.report.has_errors() {
        return Err(ValidationFailure::new(section.report).into());
    }
    Ok(section)
}

/// Build a section, keeping errors in its report instead of failing
///
/// `nested` names the keys of this table that belong to deeper namespaces.
pub(crate) fn build_section<S: AsRef<str>>(
    document: &ConfigurationDocument,
    segments: &[S],
    schema: &Schema,
    nested: &[String],
) -> ToolSection {
    let namespace = utils::join_segments(segments);

    let (present, entries, report) = match document.lookup(segments) {
        Lookup::Found(table) => {
            let (entries, report) =
                SectionValidator::validate_nested(schema, &namespace, Some(table), nested);
            (true, entries, report)
        }
        Lookup::Absent => {
            let (entries, report) =
                SectionValidator::validate_nested(schema, &namespace, None, nested);
            (false, entries, report)
        }
        Lookup::NotATable { path, found } => {
            let mut report = ValidationReport::new();
            report.add_error(
                &path,
                IssueKind::NotATable {
                    found: found.to_string(),
                },
            );
            (true, Vec::new(), report)
        }
    };

    ToolSection {
        namespace,
        present,
        entries,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::DocumentLoader;
    use crate::schema::{FieldSpec, ValueKind};
    use serde::Deserialize;

    fn coverage_schema() -> Schema {
        Schema::new("coverage")
            .field(FieldSpec::with_default("branch", ValueKind::Boolean, false))
            .field(FieldSpec::with_default(
                "source",
                ValueKind::list_of(ValueKind::String),
                Value::Array(vec![]),
            ))
    }

    #[test]
    fn test_conformant_section_preserves_values() {
        let document =
            DocumentLoader::load("[coverage]\nbranch = true\nsource = [\"pkg\"]\n").unwrap();
        let section = section(&document, "coverage", &coverage_schema()).unwrap();

        assert!(section.is_present());
        assert_eq!(section.get_bool("branch"), Some(true));
        assert_eq!(section.get_str_list("source"), Some(vec!["pkg"]));
        assert!(section.defaulted_keys().is_empty());
    }

    #[test]
    fn test_type_mismatch_with_default_note() {
        let document = DocumentLoader::load("[coverage]\nbranch = \"yes\"\n").unwrap();
        let err = section(&document, "coverage", &coverage_schema()).unwrap_err();

        let ConfigError::Validation(failure) = err else {
            panic!("expected a validation failure");
        };
        assert_eq!(failure.fields(), vec!["coverage.branch"]);
        assert_eq!(
            failure.report.errors[0].kind,
            IssueKind::TypeMismatch {
                expected: "boolean".to_string(),
                found: "string".to_string(),
            }
        );

        // The missing key is satisfied by its default, not reported as an error
        let notes: Vec<_> = failure.report.issues_for("coverage.source").collect();
        assert_eq!(notes.len(), 1);
        assert!(matches!(notes[0].kind, IssueKind::DefaultApplied { .. }));
    }

    #[test]
    fn test_schema_applied_under_another_name() {
        let document = DocumentLoader::load("[legacy.coverage]\nbranch = true\n").unwrap();
        let section = section(&document, "legacy.coverage", &coverage_schema()).unwrap();

        assert_eq!(section.namespace(), "legacy.coverage");
        assert_eq!(section.origin("source"), Some(Origin::Default));
        assert_eq!(section.defaulted_keys(), vec!["source"]);
    }

    #[test]
    fn test_namespace_that_is_not_a_table() {
        let document = DocumentLoader::load("coverage = [1, 2]\n").unwrap();
        let err = section(&document, "coverage", &coverage_schema()).unwrap_err();

        let ConfigError::Validation(failure) = err else {
            panic!("expected a validation failure");
        };
        assert_eq!(
            failure.report.errors[0].kind,
            IssueKind::NotATable {
                found: "array".to_string(),
            }
        );
    }

    #[test]
    fn test_extract_typed_view() {
        #[derive(Debug, Deserialize)]
        struct Coverage {
            branch: bool,
            source: Vec<String>,
        }

        let document = DocumentLoader::load("[coverage]\nsource = [\"pkg\", \"tests\"]\n").unwrap();
        let coverage: Coverage = section(&document, "coverage", &coverage_schema())
            .unwrap()
            .extract()
            .unwrap();

        assert!(!coverage.branch);
        assert_eq!(coverage.source, vec!["pkg", "tests"]);
    }

    #[test]
    fn test_extract_failure() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct NeedsName {
            name: String,
        }

        let document = DocumentLoader::load("[coverage]\n").unwrap();
        let err = section(&document, "coverage", &coverage_schema())
            .unwrap()
            .extract::<NeedsName>()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Extract { ref namespace, .. } if namespace == "coverage"
        ));
    }
}
