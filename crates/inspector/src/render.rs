//! Output rendering for the inspector

use anyhow::{Context, Result};
use clap::ValueEnum;
use config::{Requirement, SchemaRegistry, UnknownKeyPolicy};
use serde::Serialize;
use std::str::FromStr;
use toml::{Table, Value};
use types::{Severity, ValidationIssue, ValidationReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            other => anyhow::bail!("Unsupported output format: {}", other),
        }
    }
}

/// Convert a TOML value to JSON, rendering datetimes as strings
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(f.to_string())),
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Table(table) => table_to_json(table),
    }
}

pub fn table_to_json(table: &Table) -> serde_json::Value {
    serde_json::Value::Object(
        table
            .iter()
            .map(|(key, value)| (key.clone(), value_to_json(value)))
            .collect(),
    )
}

fn structured<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(data).context("Failed to render JSON"),
        OutputFormat::Yaml => serde_yaml::to_string(data).context("Failed to render YAML"),
        OutputFormat::Text => anyhow::bail!("Text output is not structured"),
    }
}

/// Render a resolved value (usually a table)
pub fn render_value(value: &Value, format: OutputFormat) -> Result<String> {
    match (format, value) {
        (OutputFormat::Text, Value::Table(table)) => {
            toml::to_string(table).context("Failed to render TOML")
        }
        (OutputFormat::Text, other) => Ok(other.to_string()),
        (format, value) => structured(&value_to_json(value), format),
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Note => "note",
    }
}

fn issue_line(issue: &ValidationIssue) -> String {
    format!("{}: {}", severity_label(issue.severity), issue)
}

/// Render a report, errors first, then warnings, then notes
pub fn render_report(report: &ValidationReport, format: OutputFormat) -> Result<String> {
    if format != OutputFormat::Text {
        return structured(report, format);
    }

    let mut lines: Vec<String> = report
        .errors
        .iter()
        .chain(&report.warnings)
        .chain(&report.notes)
        .map(issue_line)
        .collect();
    lines.push(report.summary());
    Ok(lines.join("\n"))
}

#[derive(Debug, Serialize)]
struct FieldSummary {
    key: String,
    kind: String,
    requirement: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
}

#[derive(Debug, Serialize)]
struct SchemaSummary {
    namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    unknown_keys: &'static str,
    fields: Vec<FieldSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exclusive: Vec<Vec<String>>,
}

fn policy_label(policy: UnknownKeyPolicy) -> &'static str {
    match policy {
        UnknownKeyPolicy::Preserve => "preserve",
        UnknownKeyPolicy::Warn => "warn",
        UnknownKeyPolicy::Deny => "deny",
    }
}

fn summarize(registry: &SchemaRegistry) -> Vec<SchemaSummary> {
    registry
        .iter()
        .map(|schema| SchemaSummary {
            namespace: schema.namespace(),
            description: schema.description().to_string(),
            unknown_keys: policy_label(schema.unknown_key_policy()),
            fields: schema
                .fields()
                .iter()
                .map(|field| {
                    let (requirement, default) = match &field.requirement {
                        Requirement::Required => ("required", None),
                        Requirement::Optional => ("optional", None),
                        Requirement::Default(value) => ("default", Some(value_to_json(value))),
                    };
                    FieldSummary {
                        key: field.key.clone(),
                        kind: field.kind.to_string(),
                        requirement,
                        default,
                        description: field.description.clone(),
                    }
                })
                .collect(),
            exclusive: schema.exclusive_groups().to_vec(),
        })
        .collect()
}

/// Describe every registered schema
pub fn render_schemas(registry: &SchemaRegistry, format: OutputFormat) -> Result<String> {
    let summaries = summarize(registry);
    if format != OutputFormat::Text {
        return structured(&summaries, format);
    }

    let mut out = String::new();
    for summary in &summaries {
        out.push_str(&format!("[{}]", summary.namespace));
        if !summary.description.is_empty() {
            out.push_str(&format!("  {}", summary.description));
        }
        out.push('\n');
        for field in &summary.fields {
            let mut line = format!("  {} ({}, {})", field.key, field.kind, field.requirement);
            if let Some(default) = &field.default {
                line.push_str(&format!(" = {}", default));
            }
            if !field.description.is_empty() {
                line.push_str(&format!("  {}", field.description));
            }
            out.push_str(&line);
            out.push('\n');
        }
        for group in &summary.exclusive {
            out.push_str(&format!("  exclusive: {}\n", group.join(", ")));
        }
        out.push_str(&format!("  unknown keys: {}\n", summary.unknown_keys));
    }
    Ok(out)
}
