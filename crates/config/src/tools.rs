//! Built-in tool schemas and the typed views their consumers read
//!
//! Each external tool gets one namespace schema here plus a serde struct
//! describing the slice of its options a consumer actually needs.

use crate::resolve::ResolvedConfiguration;
use crate::schema::{FieldSpec, Schema, UnknownKeyPolicy, ValueKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use types::{ConfigError, Result};

pub const BUILD_SYSTEM: &str = "build-system";
pub const VERSIONING: &str = "tool.setuptools_scm";
pub const TEST_RUNNER: &str = "tool.pytest.ini_options";
pub const COVERAGE_RUN: &str = "tool.coverage.run";
pub const COVERAGE_REPORT: &str = "tool.coverage.report";
pub const IMPORT_LINTER: &str = "tool.isort";
pub const CHANGELOG: &str = "tool.towncrier";
pub const PACKAGING: &str = "tool.briefcase";

fn strings(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|s| Value::String(s.to_string())).collect())
}

fn string_list() -> ValueKind {
    ValueKind::list_of(ValueKind::String)
}

fn string_or_list() -> ValueKind {
    ValueKind::AnyOf(vec![ValueKind::String, string_list()])
}

/// Every built-in schema, in registration order
pub fn builtin_schemas() -> Vec<Schema> {
    vec![
        build_system_schema(),
        versioning_schema(),
        test_runner_schema(),
        coverage_run_schema(),
        coverage_report_schema(),
        import_linter_schema(),
        changelog_schema(),
        packaging_schema(),
    ]
}

fn build_system_schema() -> Schema {
    // Projects without a build-system table get the legacy setuptools backend
    let mut legacy = Table::new();
    legacy.insert("requires".to_string(), strings(&["setuptools>=40.8.0", "wheel"]));
    legacy.insert(
        "build-backend".to_string(),
        Value::String("setuptools.build_meta:__legacy__".to_string()),
    );

    Schema::new(BUILD_SYSTEM)
        .describe("Build backend declaration")
        .field(
            FieldSpec::required("requires", string_list())
                .describe("Packages needed to build the project"),
        )
        .field(
            FieldSpec::optional("build-backend", ValueKind::String)
                .describe("Backend entry point"),
        )
        .field(FieldSpec::optional("backend-path", string_list()))
        .when_absent(legacy)
}

fn versioning_schema() -> Schema {
    Schema::new(VERSIONING)
        .describe("Version derived from source control")
        .field(FieldSpec::optional("write_to", ValueKind::String))
        .field(FieldSpec::optional("version_file", ValueKind::String))
        .field(FieldSpec::optional("write_to_template", ValueKind::String))
        .field(FieldSpec::with_default("root", ValueKind::String, "."))
        .field(FieldSpec::optional("relative_to", ValueKind::String))
        .field(FieldSpec::with_default(
            "version_scheme",
            ValueKind::choice(&[
                "guess-next-dev",
                "post-release",
                "python-simplified-semver",
                "release-branch-semver",
                "no-guess-dev",
                "only-version",
                "calver-by-date",
            ]),
            "guess-next-dev",
        ))
        .field(FieldSpec::with_default(
            "local_scheme",
            ValueKind::choice(&[
                "node-and-date",
                "node-and-timestamp",
                "dirty-tag",
                "no-local-version",
            ]),
            "node-and-date",
        ))
        .field(FieldSpec::optional("fallback_version", ValueKind::String))
        .exclusive(&["write_to", "version_file"])
}

fn test_runner_schema() -> Schema {
    Schema::new(TEST_RUNNER)
        .describe("Test discovery and warning filters")
        .field(FieldSpec::optional("minversion", ValueKind::String))
        .field(FieldSpec::with_default("testpaths", string_list(), Value::Array(vec![])))
        .field(FieldSpec::optional("addopts", string_or_list()))
        .field(FieldSpec::with_default("filterwarnings", string_list(), Value::Array(vec![])))
        .field(FieldSpec::optional("python_files", string_or_list()))
        .field(FieldSpec::optional("markers", string_list()))
        .unknown_keys(UnknownKeyPolicy::Preserve)
}

fn coverage_run_schema() -> Schema {
    Schema::new(COVERAGE_RUN)
        .describe("Coverage measurement")
        .field(FieldSpec::with_default("branch", ValueKind::Boolean, false))
        .field(FieldSpec::with_default("source", string_list(), Value::Array(vec![])))
        .field(FieldSpec::with_default("omit", string_list(), Value::Array(vec![])))
        .field(FieldSpec::with_default("parallel", ValueKind::Boolean, false))
        .field(FieldSpec::optional("data_file", ValueKind::String))
}

fn coverage_report_schema() -> Schema {
    Schema::new(COVERAGE_REPORT)
        .describe("Coverage report formatting")
        .field(FieldSpec::with_default("show_missing", ValueKind::Boolean, false))
        .field(FieldSpec::with_default("skip_covered", ValueKind::Boolean, false))
        .field(FieldSpec::with_default("exclude_lines", string_list(), Value::Array(vec![])))
        .field(FieldSpec::optional(
            "fail_under",
            ValueKind::AnyOf(vec![ValueKind::Integer, ValueKind::Float]),
        ))
        .field(FieldSpec::with_default("precision", ValueKind::Integer, 0i64))
        .field(FieldSpec::optional("ignore_errors", ValueKind::Boolean))
}

fn import_linter_schema() -> Schema {
    Schema::new(IMPORT_LINTER)
        .describe("Import statement ordering")
        .field(FieldSpec::optional(
            "profile",
            ValueKind::choice(&[
                "black",
                "django",
                "pycharm",
                "google",
                "open_stack",
                "plone",
                "attrs",
                "hug",
                "wemake",
                "appnexus",
            ]),
        ))
        .field(FieldSpec::with_default("line_length", ValueKind::Integer, 79i64))
        .field(FieldSpec::optional("multi_line_output", ValueKind::Integer))
        .field(FieldSpec::optional("include_trailing_comma", ValueKind::Boolean))
        .field(FieldSpec::optional("force_grid_wrap", ValueKind::Integer))
        .field(FieldSpec::optional("use_parentheses", ValueKind::Boolean))
        .field(FieldSpec::with_default("known_first_party", string_list(), Value::Array(vec![])))
        .field(FieldSpec::optional("known_third_party", string_list()))
        .field(FieldSpec::optional("skip", string_list()))
}

fn changelog_schema() -> Schema {
    Schema::new(CHANGELOG)
        .describe("Changelog fragment aggregation")
        .field(FieldSpec::optional("directory", ValueKind::String).describe("Fragment directory"))
        .field(FieldSpec::optional("package", ValueKind::String))
        .field(FieldSpec::with_default("package_dir", ValueKind::String, "."))
        .field(FieldSpec::with_default("filename", ValueKind::String, "NEWS.rst"))
        .field(FieldSpec::optional("title_format", ValueKind::String))
        .field(FieldSpec::optional("template", ValueKind::String))
        .field(FieldSpec::optional("issue_format", ValueKind::String))
        .field(FieldSpec::optional("underlines", ValueKind::list_of(ValueKind::Any)))
        .field(FieldSpec::with_default("single_file", ValueKind::Boolean, true))
        .field(FieldSpec::optional("type", ValueKind::list_of(ValueKind::Table)))
}

fn packaging_schema() -> Schema {
    Schema::new(PACKAGING)
        .describe("Application packaging")
        .field(FieldSpec::required("project_name", ValueKind::String))
        .field(FieldSpec::required("bundle", ValueKind::String))
        .field(FieldSpec::optional("version", ValueKind::String))
        .field(FieldSpec::optional("url", ValueKind::String))
        .field(FieldSpec::optional("license", ValueKind::String))
        .field(FieldSpec::optional("author", ValueKind::String))
        .field(FieldSpec::optional("author_email", ValueKind::String))
        .field(FieldSpec::with_default("app", ValueKind::Table, Value::Table(Table::new())))
}

/// Build backend requirements and entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSystem {
    pub requires: Vec<String>,
    #[serde(rename = "build-backend")]
    pub build_backend: Option<String>,
    #[serde(rename = "backend-path", default)]
    pub backend_path: Vec<String>,
}

/// Source-control versioning options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersioningOptions {
    pub write_to: Option<String>,
    pub version_file: Option<String>,
    pub root: String,
    pub version_scheme: String,
    pub local_scheme: String,
    pub fallback_version: Option<String>,
}

impl VersioningOptions {
    /// The file the computed version is written to, whichever key names it
    pub fn version_output(&self) -> Option<&str> {
        self.version_file.as_deref().or(self.write_to.as_deref())
    }
}

/// Command-line options given either as one string or as a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Options {
    Line(String),
    List(Vec<String>),
}

impl Options {
    /// Individual arguments; a single line is split on whitespace
    pub fn args(&self) -> Vec<String> {
        match self {
            Options::Line(line) => line.split_whitespace().map(|s| s.to_string()).collect(),
            Options::List(items) => items.clone(),
        }
    }
}

/// Test discovery options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunnerOptions {
    pub minversion: Option<String>,
    pub testpaths: Vec<String>,
    pub addopts: Option<Options>,
    pub filterwarnings: Vec<String>,
    pub python_files: Option<Options>,
}

/// Coverage measurement options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRun {
    pub branch: bool,
    pub source: Vec<String>,
    pub omit: Vec<String>,
    pub parallel: bool,
    pub data_file: Option<String>,
}

/// Coverage report formatting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub show_missing: bool,
    pub skip_covered: bool,
    pub exclude_lines: Vec<String>,
    pub fail_under: Option<f64>,
    pub precision: i64,
}

/// Import linter options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportLinterOptions {
    pub profile: Option<String>,
    pub line_length: i64,
    pub multi_line_output: Option<i64>,
    pub include_trailing_comma: Option<bool>,
    pub force_grid_wrap: Option<i64>,
    pub use_parentheses: Option<bool>,
    pub known_first_party: Vec<String>,
}

/// Changelog aggregation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogOptions {
    pub directory: Option<String>,
    pub package: Option<String>,
    pub package_dir: String,
    pub filename: String,
    pub title_format: Option<String>,
    pub template: Option<String>,
    pub issue_format: Option<String>,
    pub single_file: bool,
}

impl ChangelogOptions {
    /// Where fragments are read from
    ///
    /// Without an explicit directory, fragments live in a `newsfragments`
    /// directory inside the package.
    pub fn fragment_directory(&self) -> PathBuf {
        match (&self.directory, &self.package) {
            (Some(directory), _) => PathBuf::from(directory),
            (None, Some(package)) => {
                Path::new(&self.package_dir).join(package).join("newsfragments")
            }
            (None, None) => PathBuf::from("newsfragments"),
        }
    }
}

/// One packaged application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(skip)]
    pub name: String,
    pub formal_name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    pub icon: Option<String>,
}

impl AppConfig {
    /// Importable module name for the app
    pub fn module_name(&self) -> String {
        self.name.replace('-', "_")
    }

    /// Directories to put on the module search path so the sources import
    pub fn python_path(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for source in &self.sources {
            let parent = match Path::new(source).parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            if !dirs.contains(&parent) {
                dirs.push(parent);
            }
        }
        dirs
    }
}

/// Packaging metadata and the applications of the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectApps {
    pub project_name: String,
    pub bundle: String,
    pub version: Option<String>,
    #[serde(rename = "app", default)]
    pub apps: BTreeMap<String, AppConfig>,
}

impl ProjectApps {
    /// Pick the application to operate on
    ///
    /// A lone application is used by default; otherwise a name is needed.
    pub fn select(&self, name: Option<&str>) -> Result<&AppConfig> {
        match (self.apps.len(), name) {
            (0, _) => Err(ConfigError::NoApps),
            (_, Some(name)) => self.apps.get(name).ok_or_else(|| ConfigError::AppNotFound {
                name: name.to_string(),
            }),
            (1, None) => self.apps.values().next().ok_or(ConfigError::NoApps),
            (_, None) => Err(ConfigError::AmbiguousApp),
        }
    }
}

impl ResolvedConfiguration {
    pub fn build_system(&self) -> Result<BuildSystem> {
        self.require(BUILD_SYSTEM)?.extract()
    }

    pub fn versioning(&self) -> Result<VersioningOptions> {
        self.require(VERSIONING)?.extract()
    }

    pub fn test_runner(&self) -> Result<TestRunnerOptions> {
        self.require(TEST_RUNNER)?.extract()
    }

    pub fn coverage_run(&self) -> Result<CoverageRun> {
        self.require(COVERAGE_RUN)?.extract()
    }

    pub fn coverage_report(&self) -> Result<CoverageReport> {
        self.require(COVERAGE_REPORT)?.extract()
    }

    pub fn import_linter(&self) -> Result<ImportLinterOptions> {
        self.require(IMPORT_LINTER)?.extract()
    }

    pub fn changelog(&self) -> Result<ChangelogOptions> {
        self.require(CHANGELOG)?.extract()
    }

    /// Packaging metadata; fails with `NoApps` when the project has none
    pub fn apps(&self) -> Result<ProjectApps> {
        let section = self.require(PACKAGING)?;
        if !section.is_present() {
            return Err(ConfigError::NoApps);
        }

        let mut project: ProjectApps = section.extract()?;
        for (name, app) in project.apps.iter_mut() {
            app.name = name.clone();
        }
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::DocumentLoader;
    use crate::resolve::resolve;
    use crate::schema::SchemaRegistry;
    use types::IssueKind;

    const PYPROJECT: &str = r#"
[build-system]
requires = ["setuptools>=46.4.0", "wheel", "setuptools_scm[toml]>=3.4"]
build-backend = "setuptools.build_meta"

[tool.setuptools_scm]
write_to = "src/briefcase/_version.py"

[tool.pytest.ini_options]
testpaths = ["tests"]
filterwarnings = ["error"]

[tool.coverage.run]
parallel = true
branch = true
source = ["briefcase"]

[tool.coverage.paths]
source = ["src", "**/site-packages"]

[tool.coverage.report]
show_missing = true
exclude_lines = ["pragma: no cover", "@(abc\\.)?abstractmethod", "NotImplementedError\\(\\)"]

[tool.isort]
profile = "black"
skip_glob = ["venv*", "local"]
multi_line_output = 3

[tool.towncrier]
directory = "changes"
package = "briefcase"
package_dir = "src"
filename = "docs/background/releases.rst"
title_format = "{version} ({project_date})"
issue_format = "`#{issue} <https://github.com/beeware/briefcase/issues/{issue}>`__"
template = "changes/template.rst"
underlines = ["-", "^", "\""]

[[tool.towncrier.type]]
directory = "feature"
name = "Features"
showcontent = true
"#;

    fn resolved(source: &str) -> ResolvedConfiguration {
        let document = DocumentLoader::load(source).unwrap();
        resolve(&document, &SchemaRegistry::builtin()).unwrap()
    }

    #[test]
    fn test_full_project_resolves() {
        let config = resolved(PYPROJECT);

        let build = config.build_system().unwrap();
        assert_eq!(build.build_backend.as_deref(), Some("setuptools.build_meta"));
        assert_eq!(build.requires.len(), 3);

        let versioning = config.versioning().unwrap();
        assert_eq!(versioning.version_output(), Some("src/briefcase/_version.py"));
        assert_eq!(versioning.version_scheme, "guess-next-dev");

        let tests = config.test_runner().unwrap();
        assert_eq!(tests.testpaths, vec!["tests"]);
        assert_eq!(tests.filterwarnings, vec!["error"]);

        let run = config.coverage_run().unwrap();
        assert!(run.branch && run.parallel);
        assert_eq!(run.source, vec!["briefcase"]);

        let report = config.coverage_report().unwrap();
        assert!(report.show_missing);
        assert_eq!(report.exclude_lines.len(), 3);
        assert_eq!(report.fail_under, None);

        let isort = config.import_linter().unwrap();
        assert_eq!(isort.profile.as_deref(), Some("black"));
        assert_eq!(isort.multi_line_output, Some(3));

        let changelog = config.changelog().unwrap();
        assert_eq!(changelog.filename, "docs/background/releases.rst");
        assert_eq!(changelog.fragment_directory(), PathBuf::from("changes"));

        // tool.coverage.paths has no schema, skip_glob is not declared by isort
        let paths: Vec<_> = config.unrecognized().iter().map(|u| u.path.as_str()).collect();
        assert_eq!(paths, vec!["tool.coverage.paths"]);
        assert!(config
            .report()
            .issues_for("tool.isort.skip_glob")
            .any(|i| i.kind == IssueKind::UnknownKey));
    }

    #[test]
    fn test_missing_build_system_uses_legacy_backend() {
        let config = resolved("[tool.coverage.run]\nbranch = true\n");
        let build = config.build_system().unwrap();

        assert_eq!(build.build_backend.as_deref(), Some("setuptools.build_meta:__legacy__"));
        assert_eq!(build.requires, vec!["setuptools>=40.8.0", "wheel"]);
        assert!(!config.section(BUILD_SYSTEM).unwrap().is_present());
    }

    #[test]
    fn test_builtin_violations_are_all_reported() {
        let source = r#"
[build-system]
build-backend = "setuptools.build_meta"

[tool.setuptools_scm]
write_to = "a.py"
version_file = "b.py"
local_scheme = "sometimes"

[tool.coverage.report]
fail_under = "90"
"#;
        let document = DocumentLoader::load(source).unwrap();
        let err = resolve(&document, &SchemaRegistry::builtin()).unwrap_err();

        let ConfigError::Validation(failure) = err else {
            panic!("expected a validation failure");
        };
        assert_eq!(
            failure.fields(),
            vec![
                "build-system.requires",
                "tool.setuptools_scm.local_scheme",
                "tool.setuptools_scm.write_to",
                "tool.coverage.report.fail_under",
            ]
        );
    }

    #[test]
    fn test_fail_under_accepts_integer_and_float() {
        let config = resolved("[tool.coverage.report]\nfail_under = 90\n");
        assert_eq!(config.coverage_report().unwrap().fail_under, Some(90.0));

        let config = resolved("[tool.coverage.report]\nfail_under = 87.5\n");
        assert_eq!(config.coverage_report().unwrap().fail_under, Some(87.5));
    }

    #[test]
    fn test_addopts_string_or_list() {
        let config = resolved("[tool.pytest.ini_options]\naddopts = \"-ra -q\"\n");
        let addopts = config.test_runner().unwrap().addopts.unwrap();
        assert_eq!(addopts.args(), vec!["-ra", "-q"]);

        let config =
            resolved("[tool.pytest.ini_options]\naddopts = [\"-ra\", \"--strict-markers\"]\n");
        let addopts = config.test_runner().unwrap().addopts.unwrap();
        assert_eq!(addopts, Options::List(vec!["-ra".to_string(), "--strict-markers".to_string()]));
    }

    #[test]
    fn test_changelog_fragment_directory_defaults() {
        let config = resolved("[tool.towncrier]\npackage = \"briefcase\"\npackage_dir = \"src\"\n");
        assert_eq!(
            config.changelog().unwrap().fragment_directory(),
            PathBuf::from("src/briefcase/newsfragments")
        );
    }

    const APPS: &str = r#"
[tool.briefcase]
project_name = "Hello World"
bundle = "com.example"
version = "0.0.1"

[tool.briefcase.app.helloworld]
formal_name = "Hello World"
sources = ["src/helloworld"]
requires = ["toga"]

[tool.briefcase.app.hello-admin]
sources = ["src/admin", "lib/shared/util", "src/common"]
"#;

    #[test]
    fn test_select_named_app() {
        let apps = resolved(APPS).apps().unwrap();
        assert_eq!(apps.project_name, "Hello World");

        let app = apps.select(Some("hello-admin")).unwrap();
        assert_eq!(app.name, "hello-admin");
        assert_eq!(app.module_name(), "hello_admin");
        assert_eq!(
            app.python_path(),
            vec![PathBuf::from("src"), PathBuf::from("lib/shared")]
        );

        assert!(matches!(
            apps.select(Some("missing")),
            Err(ConfigError::AppNotFound { ref name }) if name == "missing"
        ));
        assert!(matches!(apps.select(None), Err(ConfigError::AmbiguousApp)));
    }

    #[test]
    fn test_single_app_is_the_default() {
        let source = r#"
[tool.briefcase]
project_name = "x"
bundle = "org.x"

[tool.briefcase.app.only]
sources = ["only"]
"#;
        let apps = resolved(source).apps().unwrap();

        let app = apps.select(None).unwrap();
        assert_eq!(app.name, "only");
        assert_eq!(app.requires, Vec::<String>::new());
        assert_eq!(app.python_path(), vec![PathBuf::from(".")]);

        // A lone app is not picked when another name is asked for
        assert!(matches!(
            apps.select(Some("other")),
            Err(ConfigError::AppNotFound { ref name }) if name == "other"
        ));
    }

    #[test]
    fn test_no_apps() {
        let config = resolved("");
        assert!(matches!(config.apps(), Err(ConfigError::NoApps)));

        let apps = resolved("[tool.briefcase]\nproject_name = \"x\"\nbundle = \"org.x\"\n")
            .apps()
            .unwrap();
        assert!(matches!(apps.select(None), Err(ConfigError::NoApps)));
    }
}
