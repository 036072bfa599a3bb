//! Layered configuration aggregation for project tool settings
//!
//! This crate parses a project configuration document, validates each tool
//! namespace against an explicit schema, and produces an immutable
//! [`ResolvedConfiguration`] that build, test and release tooling can read.

pub mod loader;
pub mod resolve;
pub mod schema;
pub mod section;
pub mod settings;
pub mod tools;
pub mod validation;

pub use loader::{ConfigurationDocument, DocumentLoader, Lookup};
pub use resolve::{resolve, ResolvedConfiguration, UnrecognizedNamespace};
pub use schema::{FieldSpec, Requirement, Schema, SchemaRegistry, UnknownKeyPolicy, ValueKind};
pub use section::{section, Origin, SectionEntry, ToolSection};
pub use settings::{Settings, SettingsLoader};
pub use tools::*;
pub use validation::SectionValidator;
