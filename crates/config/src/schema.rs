//! Schema definitions for tool namespaces
//!
//! A [`Schema`] describes one namespace of the configuration document: which
//! keys it expects, the tagged type of each, and what an absent key resolves
//! to. Schemas are collected in a [`SchemaRegistry`] whose registration order
//! drives the order of validation and reporting.

use std::fmt;
use toml::{Table, Value};
use types::{utils, ConfigError, Result};

/// Expected type of a configuration value
///
/// Matching is strict: an integer is not a float and a string is never read
/// as a boolean.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    Datetime,
    Table,
    /// Any value, never checked
    Any,
    /// An array whose every element has the inner kind
    ListOf(Box<ValueKind>),
    /// A string drawn from a fixed set
    Choice(Vec<String>),
    /// Any of several kinds
    AnyOf(Vec<ValueKind>),
}

impl ValueKind {
    pub fn list_of(kind: ValueKind) -> Self {
        ValueKind::ListOf(Box::new(kind))
    }

    pub fn choice(options: &[&str]) -> Self {
        ValueKind::Choice(options.iter().map(|s| s.to_string()).collect())
    }

    /// Whether `value` has this kind
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueKind::Any, _) => true,
            (ValueKind::String, Value::String(_)) => true,
            (ValueKind::Integer, Value::Integer(_)) => true,
            (ValueKind::Float, Value::Float(_)) => true,
            (ValueKind::Boolean, Value::Boolean(_)) => true,
            (ValueKind::Datetime, Value::Datetime(_)) => true,
            (ValueKind::Table, Value::Table(_)) => true,
            (ValueKind::ListOf(inner), Value::Array(items)) => {
                items.iter().all(|item| inner.matches(item))
            }
            (ValueKind::Choice(options), Value::String(s)) => options.contains(s),
            (ValueKind::AnyOf(kinds), value) => kinds.iter().any(|kind| kind.matches(value)),
            _ => false,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::String => write!(f, "string"),
            ValueKind::Integer => write!(f, "integer"),
            ValueKind::Float => write!(f, "float"),
            ValueKind::Boolean => write!(f, "boolean"),
            ValueKind::Datetime => write!(f, "datetime"),
            ValueKind::Table => write!(f, "table"),
            ValueKind::Any => write!(f, "any value"),
            ValueKind::ListOf(inner) => write!(f, "list of {}", inner),
            ValueKind::Choice(options) => write!(f, "one of [{}]", options.join(", ")),
            ValueKind::AnyOf(kinds) => {
                let names: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
                write!(f, "{}", names.join(" or "))
            }
        }
    }
}

/// What happens when a declared key is absent
#[derive(Debug, Clone, PartialEq)]
pub enum Requirement {
    /// Must be present whenever the namespace table is present
    Required,
    /// Filled with this value when absent
    Default(Value),
    /// May be absent; no value is synthesized
    Optional,
}

/// A single declared key of a namespace
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub key: String,
    pub kind: ValueKind,
    pub requirement: Requirement,
    pub description: String,
}

impl FieldSpec {
    pub fn required(key: &str, kind: ValueKind) -> Self {
        Self::new(key, kind, Requirement::Required)
    }

    pub fn optional(key: &str, kind: ValueKind) -> Self {
        Self::new(key, kind, Requirement::Optional)
    }

    pub fn with_default(key: &str, kind: ValueKind, default: impl Into<Value>) -> Self {
        Self::new(key, kind, Requirement::Default(default.into()))
    }

    fn new(key: &str, kind: ValueKind, requirement: Requirement) -> Self {
        Self {
            key: key.to_string(),
            kind,
            requirement,
            description: String::new(),
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// Policy for keys present in the document but not declared by the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownKeyPolicy {
    /// Keep the value silently
    Preserve,
    /// Keep the value and report a warning
    #[default]
    Warn,
    /// Report an error
    Deny,
}

/// Schema of one tool namespace
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    segments: Vec<String>,
    fields: Vec<FieldSpec>,
    exclusive: Vec<Vec<String>>,
    unknown_keys: UnknownKeyPolicy,
    absent: Option<Table>,
    description: String,
}

impl Schema {
    /// Create an empty schema for a dotted namespace path
    pub fn new(namespace: &str) -> Self {
        Self {
            segments: utils::split_path(namespace),
            fields: Vec::new(),
            exclusive: Vec::new(),
            unknown_keys: UnknownKeyPolicy::default(),
            absent: None,
            description: String::new(),
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare a group of keys of which at most one may be set
    pub fn exclusive(mut self, keys: &[&str]) -> Self {
        self.exclusive.push(keys.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn unknown_keys(mut self, policy: UnknownKeyPolicy) -> Self {
        self.unknown_keys = policy;
        self
    }

    /// Table substituted when the namespace is missing from the document
    pub fn when_absent(mut self, table: Table) -> Self {
        self.absent = Some(table);
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn namespace(&self) -> String {
        utils::join_segments(&self.segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get_field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn exclusive_groups(&self) -> &[Vec<String>] {
        &self.exclusive
    }

    pub fn unknown_key_policy(&self) -> UnknownKeyPolicy {
        self.unknown_keys
    }

    pub fn absent_fallback(&self) -> Option<&Table> {
        self.absent.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Check the schema for internal consistency
    fn check(&self) -> Result<()> {
        let invalid = |message: String| ConfigError::InvalidSchema {
            namespace: self.namespace(),
            message,
        };

        if self.segments.is_empty() {
            return Err(invalid("namespace path cannot be empty".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.key.as_str()) {
                return Err(invalid(format!("key '{}' is declared twice", field.key)));
            }

            if let Requirement::Default(default) = &field.requirement {
                if !field.kind.matches(default) {
                    return Err(invalid(format!(
                        "default for '{}' is not a {}",
                        field.key, field.kind
                    )));
                }
            }
        }

        for group in &self.exclusive {
            if group.len() < 2 {
                return Err(invalid("an exclusive group needs at least two keys".to_string()));
            }
        }

        if let Some(absent) = &self.absent {
            for (key, value) in absent {
                if let Some(field) = self.get_field(key) {
                    if !field.kind.matches(value) {
                        return Err(invalid(format!(
                            "fallback for '{}' is not a {}",
                            key, field.kind
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Ordered collection of schemas, one per namespace
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<Schema>,
}

impl SchemaRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in tool schema
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for schema in crate::tools::builtin_schemas() {
            registry.push_unchecked(schema);
        }
        registry
    }

    /// Register a schema; namespaces must be unique
    pub fn register(&mut self, schema: Schema) -> Result<&mut Self> {
        schema.check()?;

        if self.schemas.iter().any(|s| s.segments == schema.segments) {
            return Err(ConfigError::DuplicateSchema {
                namespace: schema.namespace(),
            });
        }

        self.push_unchecked(schema);
        Ok(self)
    }

    fn push_unchecked(&mut self, schema: Schema) {
        tracing::debug!(namespace = %schema.namespace(), "Registered schema");
        self.schemas.push(schema);
    }

    pub fn get(&self, namespace: &str) -> Option<&Schema> {
        let segments = utils::split_path(namespace);
        self.schemas.iter().find(|s| s.segments == segments)
    }

    /// Schemas in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.iter()
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.schemas.iter().map(|s| s.namespace()).collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Whether a schema is registered for exactly this path
    pub fn claims<S: AsRef<str>>(&self, segments: &[S]) -> bool {
        self.schemas.iter().any(|s| {
            s.segments.len() == segments.len()
                && s.segments.iter().zip(segments).all(|(a, b)| a == b.as_ref())
        })
    }

    /// Whether this path leads to some registered namespace
    pub fn is_intermediate<S: AsRef<str>>(&self, segments: &[S]) -> bool {
        self.schemas
            .iter()
            .any(|s| utils::is_proper_prefix(segments, s.segments.as_slice()))
    }

    /// Keys directly below `segments` that lead to deeper registered namespaces
    ///
    /// Registration order, without duplicates.
    pub fn nested_keys<S: AsRef<str>>(&self, segments: &[S]) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for schema in &self.schemas {
            if utils::is_proper_prefix(segments, schema.segments.as_slice()) {
                let key = &schema.segments[segments.len()];
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }
        keys
    }
}
