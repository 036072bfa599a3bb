//! projconf - project configuration inspector

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{SchemaRegistry, Settings, SettingsLoader};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod render;

use render::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "projconf", version, about = "Validate and inspect project tool configuration")]
struct Cli {
    /// YAML file with inspector settings
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Treat unrecognized namespaces as failures
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a document against the built-in schemas
    Check {
        path: PathBuf,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Print the resolved configuration
    Show {
        path: PathBuf,
        /// Only print this namespace, e.g. tool.coverage.run
        #[arg(long)]
        namespace: Option<String>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Print the selected application and its module search path
    App {
        path: PathBuf,
        #[arg(long)]
        app: Option<String>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// List the built-in schemas
    Schemas {
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Print the effective inspector settings
    Settings {
        /// Write an example settings file here instead
        #[arg(long)]
        example: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    // Load .env file if it exists
    let dotenv_result = dotenv::dotenv();

    let cli = Cli::parse();
    let settings = SettingsLoader::load(cli.settings.as_deref())
        .context("Failed to load inspector settings")?;

    init_logging(&settings)?;

    if let Err(e) = dotenv_result {
        // Only warn if the error is not "file not found"
        if !e.to_string().contains("No such file or directory") {
            warn!("Could not load .env file: {}", e);
        }
    }

    info!("Starting projconf v{}", env!("CARGO_PKG_VERSION"));

    let strict = cli.strict || settings.strict;
    let default_format: OutputFormat = settings.output_format.parse()?;
    let registry = SchemaRegistry::builtin();

    match cli.command {
        Command::Check { path, format } => {
            let format = format.unwrap_or(default_format);
            let outcome = commands::check(&path, &registry, strict, format)?;
            println!("{}", outcome.output);
            if !outcome.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Show { path, namespace, format } => {
            let output = commands::show(
                &path,
                &registry,
                namespace.as_deref(),
                strict,
                format.unwrap_or(default_format),
            )?;
            println!("{}", output);
        }
        Command::App { path, app, format } => {
            let format = format.unwrap_or(default_format);
            let output = commands::app(&path, &registry, app.as_deref(), format)?;
            println!("{}", output);
        }
        Command::Schemas { format } => {
            println!("{}", render::render_schemas(&registry, format.unwrap_or(default_format))?);
        }
        Command::Settings { example } => match example {
            Some(path) => {
                SettingsLoader::create_example(&path)?;
                info!("Example settings written to {}", path.display());
            }
            None => {
                let report = SettingsLoader::validate(&settings);
                for issue in &report.warnings {
                    warn!("{}", issue);
                }
                let yaml =
                    serde_yaml::to_string(&settings).context("Failed to render settings")?;
                print!("{}", yaml);
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

/// Initialize logging from the inspector settings
///
/// `RUST_LOG` still takes precedence over the configured level. Logs go to
/// stderr so command output stays machine-readable.
fn init_logging(settings: &Settings) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match settings.log_format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize pretty logging")?;
        }
    }

    info!("Log level: {}", settings.log_level);
    info!("Log format: {}", settings.log_format);

    Ok(())
}
