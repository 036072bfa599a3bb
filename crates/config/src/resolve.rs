//! Resolution of a whole document against a schema registry

use crate::loader::ConfigurationDocument;
use crate::schema::SchemaRegistry;
use crate::section::{build_section, ToolSection};
use toml::{Table, Value};
use tracing::{info, warn};
use types::{utils, ConfigError, IssueKind, Result, ValidationFailure, ValidationReport};

/// A namespace with no registered schema, kept exactly as written
#[derive(Debug, Clone, PartialEq)]
pub struct UnrecognizedNamespace {
    pub path: String,
    pub value: Value,
}

/// The immutable result of resolving a document
///
/// Holds one section per registered schema (in registration order), every
/// unrecognized namespace, and the advisory issues raised along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfiguration {
    sections: Vec<ToolSection>,
    unrecognized: Vec<UnrecognizedNamespace>,
    report: ValidationReport,
}

impl ResolvedConfiguration {
    pub fn section(&self, namespace: &str) -> Option<&ToolSection> {
        let wanted = utils::join_segments(&utils::split_path(namespace));
        self.sections.iter().find(|s| s.namespace() == wanted)
    }

    /// Like [`section`](Self::section), failing for unregistered namespaces
    pub fn require(&self, namespace: &str) -> Result<&ToolSection> {
        self.section(namespace)
            .ok_or_else(|| ConfigError::UnknownNamespace {
                namespace: namespace.to_string(),
            })
    }

    pub fn sections(&self) -> &[ToolSection] {
        &self.sections
    }

    pub fn unrecognized(&self) -> &[UnrecognizedNamespace] {
        &self.unrecognized
    }

    pub fn is_recognized(&self, namespace: &str) -> bool {
        self.section(namespace).is_some()
    }

    /// Warnings and notes collected during resolution
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// Value at a dotted path such as `tool.coverage.run.branch`
    ///
    /// The longest registered namespace prefix interprets the remainder;
    /// unrecognized namespaces are searched verbatim.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments = utils::split_path(path);

        for split in (1..segments.len()).rev() {
            let namespace = utils::join_segments(&segments[..split]);
            if let Some(section) = self.section(&namespace) {
                let value = section.get(&segments[split])?;
                return descend(value, &segments[split + 1..]);
            }
        }

        for split in (1..=segments.len()).rev() {
            let namespace = utils::join_segments(&segments[..split]);
            if let Some(entry) = self.unrecognized.iter().find(|u| u.path == namespace) {
                return descend(&entry.value, &segments[split..]);
            }
        }

        None
    }

    /// The whole resolved view as a nested table
    ///
    /// Sections appear with their defaults filled in; absent sections without
    /// any value are left out.
    pub fn to_table(&self) -> Table {
        let mut root = Table::new();
        for section in &self.sections {
            if section.is_present() || !section.entries().is_empty() {
                insert_at(
                    &mut root,
                    &utils::split_path(section.namespace()),
                    Value::Table(section.to_table()),
                );
            }
        }
        for entry in &self.unrecognized {
            insert_at(&mut root, &utils::split_path(&entry.path), entry.value.clone());
        }
        root
    }
}

fn descend<'a>(mut value: &'a Value, rest: &[String]) -> Option<&'a Value> {
    for segment in rest {
        value = value.as_table()?.get(segment)?;
    }
    Some(value)
}

fn insert_at(root: &mut Table, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Table(Table::new()));
        if !slot.is_table() {
            *slot = Value::Table(Table::new());
        }
        current = match slot {
            Value::Table(table) => table,
            _ => return,
        };
    }

    // A parent section and a nested one share a table
    match value {
        Value::Table(incoming) if current.get(last).is_some_and(Value::is_table) => {
            if let Some(Value::Table(existing)) = current.get_mut(last) {
                for (key, value) in incoming {
                    existing.entry(key).or_insert(value);
                }
            }
        }
        value => {
            current.insert(last.clone(), value);
        }
    }
}

/// Resolve every registered namespace of `document`
///
/// Sections are validated in registration order and all of their errors are
/// combined into a single [`ValidationFailure`]. Namespaces without a schema
/// are preserved and reported as warnings.
pub fn resolve(
    document: &ConfigurationDocument,
    registry: &SchemaRegistry,
) -> Result<ResolvedConfiguration> {
    let mut report = ValidationReport::new();
    let mut sections = Vec::with_capacity(registry.len());

    for schema in registry.iter() {
        let nested = registry.nested_keys(schema.segments());
        let section = build_section(document, schema.segments(), schema, &nested);
        report.merge(section.report().clone());
        sections.push(section);
    }

    let mut unrecognized = Vec::new();
    collect_unrecognized(document.root(), &mut Vec::new(), registry, false, &mut unrecognized);

    for entry in &unrecognized {
        warn!(namespace = %entry.path, "No schema registered for namespace, preserving as-is");
        report.add_warning(&entry.path, IssueKind::UnknownNamespace);
    }

    if report.has_errors() {
        warn!(summary = %report.summary(), "Configuration validation failed");
        return Err(ValidationFailure::new(report).into());
    }

    info!(
        sections = sections.len(),
        unrecognized = unrecognized.len(),
        "Configuration resolved"
    );

    Ok(ResolvedConfiguration {
        sections,
        unrecognized,
        report,
    })
}

/// Walk the document and collect every table that no schema claims
///
/// The longest registered path wins: prefixes of registered paths are
/// descended into even when a schema claims them, and anything else is an
/// unrecognized namespace. Inside a claimed table (`owned`), the remaining
/// keys belong to that table's section.
fn collect_unrecognized(
    table: &Table,
    prefix: &mut Vec<String>,
    registry: &SchemaRegistry,
    owned: bool,
    out: &mut Vec<UnrecognizedNamespace>,
) {
    for (key, value) in table {
        prefix.push(key.clone());
        let claimed = registry.claims(prefix.as_slice());

        if registry.is_intermediate(prefix.as_slice()) {
            if let Value::Table(child) = value {
                collect_unrecognized(child, prefix, registry, claimed, out);
            }
        } else if !claimed && !owned {
            out.push(UnrecognizedNamespace {
                path: utils::join_segments(prefix.as_slice()),
                value: value.clone(),
            });
        }

        prefix.pop();
    }
}
