//! Section validation
//!
//! Validation is exhaustive: every declared key, every undeclared key and
//! every exclusive group is checked, and each violation is added to the
//! report instead of stopping at the first one.

use crate::schema::{Requirement, Schema, UnknownKeyPolicy, ValueKind};
use crate::section::{Origin, SectionEntry};
use toml::{Table, Value};
use types::{utils, IssueKind, ValidationReport};

const MAX_NOTE_VALUE_CHARS: usize = 60;

/// Validator for a single namespace table against its schema
pub struct SectionValidator;

impl SectionValidator {
    /// Validate `table` (or its absence) against `schema`
    ///
    /// Returns the normalized entries together with every issue found. Issue
    /// fields are reported under `namespace`.
    pub fn validate(
        schema: &Schema,
        namespace: &str,
        table: Option<&Table>,
    ) -> (Vec<SectionEntry>, ValidationReport) {
        Self::validate_nested(schema, namespace, table, &[])
    }

    /// Like [`validate`](Self::validate), leaving out the `nested` keys
    ///
    /// Nested keys lead to namespaces owned by deeper schemas and are neither
    /// reported nor kept as extra values of this section.
    pub fn validate_nested(
        schema: &Schema,
        namespace: &str,
        table: Option<&Table>,
        nested: &[String],
    ) -> (Vec<SectionEntry>, ValidationReport) {
        let mut report = ValidationReport::new();
        let mut entries = Vec::new();

        let present = table.is_some();
        let (source, origin) = match table {
            Some(table) => (Some(table), Origin::Document),
            None => (schema.absent_fallback(), Origin::Fallback),
        };

        // Declared keys, in declaration order
        Self::validate_declared(
            schema,
            namespace,
            source,
            origin,
            present,
            &mut entries,
            &mut report,
        );

        // Undeclared keys, in document order
        if let Some(source) = source {
            Self::validate_undeclared(
                schema,
                namespace,
                source,
                origin,
                nested,
                &mut entries,
                &mut report,
            );
            Self::validate_exclusive(schema, namespace, source, &mut report);
        }

        (entries, report)
    }

    fn validate_declared(
        schema: &Schema,
        namespace: &str,
        source: Option<&Table>,
        origin: Origin,
        present: bool,
        entries: &mut Vec<SectionEntry>,
        report: &mut ValidationReport,
    ) {
        for spec in schema.fields() {
            let field = utils::join_path(namespace, &spec.key);

            if let Some(value) = source.and_then(|s| s.get(&spec.key)) {
                Self::check_value(&spec.kind, value, &field, report);
                entries.push(SectionEntry {
                    key: spec.key.clone(),
                    value: value.clone(),
                    origin,
                    declared: true,
                });
                continue;
            }

            match &spec.requirement {
                Requirement::Required if present => {
                    report.add_error(&field, IssueKind::MissingRequired);
                }
                Requirement::Required | Requirement::Optional => {}
                Requirement::Default(default) => {
                    if present {
                        report.add_note(
                            &field,
                            IssueKind::DefaultApplied {
                                value: utils::truncate_for_display(
                                    &default.to_string(),
                                    MAX_NOTE_VALUE_CHARS,
                                ),
                            },
                        );
                    }
                    entries.push(SectionEntry {
                        key: spec.key.clone(),
                        value: default.clone(),
                        origin: Origin::Default,
                        declared: true,
                    });
                }
            }
        }
    }

    fn validate_undeclared(
        schema: &Schema,
        namespace: &str,
        source: &Table,
        origin: Origin,
        nested: &[String],
        entries: &mut Vec<SectionEntry>,
        report: &mut ValidationReport,
    ) {
        for (key, value) in source {
            if schema.get_field(key).is_some() || nested.contains(key) {
                continue;
            }

            let field = utils::join_path(namespace, key);
            match schema.unknown_key_policy() {
                UnknownKeyPolicy::Deny => {
                    report.add_error(&field, IssueKind::UnknownKey);
                    continue;
                }
                UnknownKeyPolicy::Warn => report.add_warning(&field, IssueKind::UnknownKey),
                UnknownKeyPolicy::Preserve => {}
            }

            entries.push(SectionEntry {
                key: key.clone(),
                value: value.clone(),
                origin,
                declared: false,
            });
        }
    }

    fn validate_exclusive(
        schema: &Schema,
        namespace: &str,
        source: &Table,
        report: &mut ValidationReport,
    ) {
        for group in schema.exclusive_groups() {
            let set: Vec<String> = group
                .iter()
                .filter(|key| source.contains_key(key.as_str()))
                .cloned()
                .collect();

            if set.len() > 1 {
                report.add_error(
                    &utils::join_path(namespace, &set[0]),
                    IssueKind::MutuallyExclusive { keys: set },
                );
            }
        }
    }

    /// Check one value against its kind, reporting every mismatch
    ///
    /// List elements are checked individually and reported as `field[i]`.
    pub fn check_value(
        kind: &ValueKind,
        value: &Value,
        field: &str,
        report: &mut ValidationReport,
    ) {
        match (kind, value) {
            (ValueKind::ListOf(inner), Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    Self::check_value(inner, item, &format!("{}[{}]", field, index), report);
                }
            }
            (ValueKind::Choice(options), Value::String(s)) => {
                if !options.contains(s) {
                    report.add_error(
                        field,
                        IssueKind::InvalidChoice {
                            value: s.clone(),
                            allowed: options.clone(),
                        },
                    );
                }
            }
            (ValueKind::Choice(_), other) => {
                report.add_error(field, Self::mismatch("string", other));
            }
            (kind, value) if kind.matches(value) => {}
            (kind, other) => {
                report.add_error(field, Self::mismatch(&kind.to_string(), other));
            }
        }
    }

    fn mismatch(expected: &str, found: &Value) -> IssueKind {
        IssueKind::TypeMismatch {
            expected: expected.to_string(),
            found: found.type_str().to_string(),
        }
    }
}
