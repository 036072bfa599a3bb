//! Subcommand implementations
//!
//! Each command returns its rendered output so that `main` only decides where
//! it goes and which exit status to use.

use crate::render::{self, OutputFormat};
use anyhow::{Context, Result};
use config::{resolve, DocumentLoader, ResolvedConfiguration, SchemaRegistry};
use std::path::Path;
use tracing::{debug, info};
use types::{ConfigError, IssueKind, ValidationReport};

/// Rendered output plus whether the command succeeded
#[derive(Debug)]
pub struct Outcome {
    pub output: String,
    pub success: bool,
}

fn load_and_resolve(path: &Path, registry: &SchemaRegistry) -> Result<ResolvedConfiguration> {
    let document = DocumentLoader::load_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    resolve(&document, registry).with_context(|| format!("Failed to resolve {}", path.display()))
}

fn strict_failures(resolved: &ResolvedConfiguration) -> ValidationReport {
    let mut report = ValidationReport::new();
    for entry in resolved.unrecognized() {
        report.add_error(&entry.path, IssueKind::UnknownNamespace);
    }
    report
}

/// Validate a document and report every issue found
pub fn check(
    path: &Path,
    registry: &SchemaRegistry,
    strict: bool,
    format: OutputFormat,
) -> Result<Outcome> {
    let document = match DocumentLoader::load_file(path) {
        Ok(document) => document,
        Err(ConfigError::Parse(err)) => {
            return Ok(Outcome {
                output: format!("{}: {}", path.display(), err),
                success: false,
            });
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to load {}", path.display()));
        }
    };

    let (report, success) = match resolve(&document, registry) {
        Ok(resolved) => {
            let mut report = resolved.report().clone();
            if strict {
                report.merge(strict_failures(&resolved));
            }
            let success = !report.has_errors();
            (report, success)
        }
        Err(ConfigError::Validation(failure)) => (failure.report, false),
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to resolve {}", path.display()));
        }
    };

    info!(path = %path.display(), success, "{}", report.summary());
    Ok(Outcome {
        output: render::render_report(&report, format)?,
        success,
    })
}

/// Print the resolved view, or a single namespace of it
pub fn show(
    path: &Path,
    registry: &SchemaRegistry,
    namespace: Option<&str>,
    strict: bool,
    format: OutputFormat,
) -> Result<String> {
    let resolved = load_and_resolve(path, registry)?;

    if strict {
        let failures = strict_failures(&resolved);
        if failures.has_errors() {
            anyhow::bail!("Unrecognized namespaces in strict mode:\n{}", failures.render_errors());
        }
    }

    let value = match namespace {
        None => toml::Value::Table(resolved.to_table()),
        Some(namespace) => match resolved.section(namespace) {
            Some(section) => toml::Value::Table(section.to_table()),
            None => resolved
                .get(namespace)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownNamespace {
                    namespace: namespace.to_string(),
                })?,
        },
    };

    debug!(namespace = namespace.unwrap_or("<all>"), "Rendering resolved view");
    render::render_value(&value, format)
}

/// Describe the selected application and its module search path
pub fn app(
    path: &Path,
    registry: &SchemaRegistry,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let resolved = load_and_resolve(path, registry)?;
    let project = resolved.apps().context("Failed to read packaging configuration")?;
    let app = project.select(name)?;

    let python_path = std::env::join_paths(app.python_path())
        .context("Source directory cannot be placed on a search path")?
        .to_string_lossy()
        .into_owned();

    match format {
        OutputFormat::Text => {
            let mut lines = vec![
                format!("app: {}", app.name),
                format!("module: {}", app.module_name()),
            ];
            if let Some(formal_name) = &app.formal_name {
                lines.push(format!("formal name: {}", formal_name));
            }
            lines.push(format!("bundle: {}.{}", project.bundle, app.module_name()));
            lines.push(format!("sources: {}", app.sources.join(", ")));
            lines.push(format!("python path: {}", python_path));
            Ok(lines.join("\n"))
        }
        format => {
            let summary = serde_json::json!({
                "app": app.name,
                "module": app.module_name(),
                "formal_name": app.formal_name,
                "bundle": project.bundle,
                "sources": app.sources,
                "requires": app.requires,
                "python_path": python_path,
            });
            match format {
                OutputFormat::Yaml => {
                    serde_yaml::to_string(&summary).context("Failed to render YAML")
                }
                _ => serde_json::to_string_pretty(&summary).context("Failed to render JSON"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_document(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const PROJECT: &str = r#"
[build-system]
requires = ["setuptools>=60", "setuptools_scm[toml]>=7.0"]
build-backend = "setuptools.build_meta"

[tool.coverage.run]
branch = true

[tool.black]
line-length = 88

[tool.briefcase]
project_name = "Hello"
bundle = "com.example"

[tool.briefcase.app.hello-world]
formal_name = "Hello World"
sources = ["src/hello_world"]
"#;

    #[test]
    fn test_check_valid_document() {
        let file = write_document(PROJECT);
        let registry = SchemaRegistry::builtin();

        let outcome = check(file.path(), &registry, false, OutputFormat::Text).unwrap();
        assert!(outcome.success);
        assert!(outcome.output.contains("warning: tool.black:"));
    }

    #[test]
    fn test_check_strict_rejects_unknown_namespace() {
        let file = write_document(PROJECT);
        let registry = SchemaRegistry::builtin();

        let outcome = check(file.path(), &registry, true, OutputFormat::Text).unwrap();
        assert!(!outcome.success);
        assert!(outcome.output.contains("error: tool.black:"));
    }

    #[test]
    fn test_check_reports_every_violation() {
        let file = write_document(
            r#"
[tool.coverage.run]
branch = "yes"

[tool.coverage.report]
fail_under = "high"
"#,
        );
        let registry = SchemaRegistry::builtin();

        let outcome = check(file.path(), &registry, false, OutputFormat::Json).unwrap();
        assert!(!outcome.success);
        let json: serde_json::Value = serde_json::from_str(&outcome.output).unwrap();
        let fields: Vec<&str> = json["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|issue| issue["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["tool.coverage.run.branch", "tool.coverage.report.fail_under"]);
    }

    #[test]
    fn test_check_parse_error_is_a_failure() {
        let file = write_document("[tool.coverage.run\nbranch = true\n");
        let registry = SchemaRegistry::builtin();

        let outcome = check(file.path(), &registry, false, OutputFormat::Text).unwrap();
        assert!(!outcome.success);
        assert!(outcome.output.contains("Configuration parse error at line"));
    }

    #[test]
    fn test_check_missing_file_is_an_error() {
        let registry = SchemaRegistry::builtin();
        let missing = Path::new("/nonexistent/pyproject.toml");
        assert!(check(missing, &registry, false, OutputFormat::Text).is_err());
    }

    #[test]
    fn test_show_namespace_with_defaults() {
        let file = write_document(PROJECT);
        let registry = SchemaRegistry::builtin();

        let namespace = Some("tool.coverage.run");
        let output = show(file.path(), &registry, namespace, false, OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["branch"], serde_json::json!(true));
        assert_eq!(json["parallel"], serde_json::json!(false));
    }

    #[test]
    fn test_show_unrecognized_namespace_verbatim() {
        let file = write_document(PROJECT);
        let registry = SchemaRegistry::builtin();

        let output =
            show(file.path(), &registry, Some("tool.black"), false, OutputFormat::Text).unwrap();
        assert!(output.contains("line-length = 88"));
        let missing = show(file.path(), &registry, Some("tool.missing"), false, OutputFormat::Text);
        assert!(missing.is_err());
    }

    #[test]
    fn test_show_structured_output_keeps_document_order() {
        let file = write_document("[tool.black]\nzeta = 1\nalpha = 2\n");
        let registry = SchemaRegistry::builtin();

        let black = Some("tool.black");
        let json = show(file.path(), &registry, black, false, OutputFormat::Json).unwrap();
        assert!(json.find("zeta").unwrap() < json.find("alpha").unwrap());

        let yaml = show(file.path(), &registry, black, false, OutputFormat::Yaml).unwrap();
        assert!(yaml.find("zeta").unwrap() < yaml.find("alpha").unwrap());
    }

    #[test]
    fn test_show_strict_fails_on_unknown_namespace() {
        let file = write_document(PROJECT);
        let registry = SchemaRegistry::builtin();
        assert!(show(file.path(), &registry, None, true, OutputFormat::Text).is_err());
    }

    #[test]
    fn test_app_single_app_selected_by_default() {
        let file = write_document(PROJECT);
        let registry = SchemaRegistry::builtin();

        let output = app(file.path(), &registry, None, OutputFormat::Text).unwrap();
        assert!(output.contains("app: hello-world"));
        assert!(output.contains("module: hello_world"));
        assert!(output.contains("python path: src"));
    }

    #[test]
    fn test_app_unknown_name() {
        let file = write_document(PROJECT);
        let registry = SchemaRegistry::builtin();

        let err = app(file.path(), &registry, Some("other"), OutputFormat::Text).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::AppNotFound { name }) if name == "other"
        ));
    }
}
