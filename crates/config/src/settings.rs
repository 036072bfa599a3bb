//! Settings for the projconf inspector itself
//!
//! These are unrelated to the project document being inspected: they control
//! logging and output of the binary, layered from defaults, an optional YAML
//! file and `PROJCONF_` environment variables.

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use types::{IssueKind, ValidationFailure, ValidationReport};

/// Inspector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Output format (text, json, yaml)
    #[serde(default = "default_output_format")]
    pub output_format: String,
    /// Treat unrecognized namespaces as failures
    #[serde(default)]
    pub strict: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_output_format() -> String {
    "text".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            output_format: default_output_format(),
            strict: false,
        }
    }
}

/// Loader for inspector settings
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from defaults, an optional YAML file and the environment
    pub fn load(settings_path: Option<&Path>) -> Result<Settings> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        if let Some(path) = settings_path {
            if !path.exists() {
                anyhow::bail!("Settings file not found: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        let settings: Settings = figment
            // Override with environment variables (prefixed with PROJCONF_)
            .merge(Env::prefixed("PROJCONF_"))
            .extract()
            .context("Failed to parse settings")?;

        Self::check(&settings)?;
        Ok(settings)
    }

    /// Load settings from a YAML string (for testing)
    pub fn load_from_str(yaml_content: &str) -> Result<Settings> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Yaml::string(yaml_content))
            .extract()
            .context("Failed to parse settings from string")?;

        Self::check(&settings)?;
        Ok(settings)
    }

    fn check(settings: &Settings) -> Result<()> {
        let report = Self::validate(settings);
        if report.has_errors() {
            return Err(ValidationFailure::new(report).into());
        }
        Ok(())
    }

    /// Validate settings values
    pub fn validate(settings: &Settings) -> ValidationReport {
        let mut report = ValidationReport::new();

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&settings.log_level.as_str()) {
            report.add_error(
                "log_level",
                IssueKind::InvalidChoice {
                    value: settings.log_level.clone(),
                    allowed: valid_levels.iter().map(|s| s.to_string()).collect(),
                },
            );
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&settings.log_format.as_str()) {
            report.add_error(
                "log_format",
                IssueKind::InvalidChoice {
                    value: settings.log_format.clone(),
                    allowed: valid_log_formats.iter().map(|s| s.to_string()).collect(),
                },
            );
        }

        let valid_output_formats = ["text", "json", "yaml"];
        if !valid_output_formats.contains(&settings.output_format.as_str()) {
            report.add_error(
                "output_format",
                IssueKind::InvalidChoice {
                    value: settings.output_format.clone(),
                    allowed: valid_output_formats.iter().map(|s| s.to_string()).collect(),
                },
            );
        }

        if settings.log_level == "trace" || settings.log_level == "debug" {
            report.add_warning(
                "log_level",
                IssueKind::Invalid {
                    message: "debug/trace logging is verbose".to_string(),
                },
            );
        }

        report
    }

    /// Write the default settings as an example YAML file
    pub fn create_example<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = serde_yaml::to_string(&Settings::default())
            .context("Failed to serialize default settings")?;

        std::fs::write(path.as_ref(), yaml_content)
            .context("Failed to write example settings file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.output_format, "text");
        assert!(!settings.strict);
        assert!(SettingsLoader::validate(&settings).is_valid());
    }

    #[test]
    fn test_load_from_string() {
        let yaml = "log_level: debug\noutput_format: json\nstrict: true\n";
        let settings = SettingsLoader::load_from_str(yaml).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.log_format, "pretty");
        assert_eq!(settings.output_format, "json");
        assert!(settings.strict);
    }

    #[test]
    fn test_validation_errors() {
        let result = SettingsLoader::load_from_str("log_level: loud\noutput_format: xml\n");
        let err = result.unwrap_err();
        let failure = err.downcast_ref::<ValidationFailure>().unwrap();
        assert_eq!(failure.fields(), vec!["log_level", "output_format"]);
    }

    #[test]
    fn test_missing_settings_file() {
        let result = SettingsLoader::load(Some(Path::new("/nonexistent/projconf.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_example() {
        let temp_file = NamedTempFile::new().unwrap();
        SettingsLoader::create_example(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("log_level:"));
        assert!(content.contains("output_format:"));

        let settings = SettingsLoader::load_from_str(&content).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
