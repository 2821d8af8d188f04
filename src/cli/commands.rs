//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap and
//! dispatches each subcommand against a resolver built from declaration files.

use crate::config::Config;
use crate::error::Result;
use crate::spec::{ParameterSpec, ParameterValue, SourceRegistry};
use crate::utils::format::{DisplayUtils, OutputFormat, TableFormatter};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "ccx")]
#[command(about = "Resolve typed configuration parameters from layered sources")]
#[command(version, author)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Parameter declaration file (.toml, .yaml)
    #[arg(long, global = true, value_name = "FILE", env = "CCX_PARAMS")]
    pub params: Option<PathBuf>,

    /// Source declaration files, highest priority first
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "CCX_SOURCES",
        value_delimiter = ','
    )]
    pub sources: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve every declared parameter and report the ones with no value
    Check,
    /// Show declared parameters with their type and backing sources
    Info {
        /// Parameter name (all parameters when omitted)
        name: Option<String>,
    },
    /// Resolve one parameter and print its typed value
    Get {
        /// Parameter name
        name: String,
        /// Print secret values instead of masking them
        #[arg(long)]
        reveal: bool,
    },
    /// Resolve one parameter and show the fetch state of each of its sources
    Status {
        /// Parameter name
        name: String,
    },
}

impl Cli {
    /// Build the resolver described by `--params` and `--sources`.
    pub fn load_config(&self) -> Result<Config> {
        let params = self.params.as_ref().ok_or_else(|| {
            crate::error::ComposerError::invalid_argument(
                "a parameter declaration file is required (--params or CCX_PARAMS)",
            )
        })?;
        let parameters = ParameterSpec::from_file(params)?;
        let registry = SourceRegistry::new();
        debug!(
            "Loading {} source declaration files against {}",
            self.sources.len(),
            params.display()
        );
        Config::from_files(parameters, &self.sources, &registry)
    }

    pub fn execute(self) -> Result<()> {
        let config = self.load_config()?;
        let formatter = TableFormatter::new(self.format, self.no_color);
        let display = DisplayUtils::new(self.no_color);

        match self.command {
            Commands::Check => execute_check(&config, &display),
            Commands::Info { name } => execute_info(&config, name.as_deref(), &formatter),
            Commands::Get { name, reveal } => {
                execute_get(&config, &name, reveal, self.format, &display)
            }
            Commands::Status { name } => execute_status(&config, &name, &formatter),
        }
    }
}

fn execute_check(config: &Config, display: &DisplayUtils) -> Result<()> {
    config.preload()?;
    display.print_success(&format!(
        "All {} parameters resolved",
        config.parameters().len()
    ));
    Ok(())
}

fn execute_info(config: &Config, name: Option<&str>, formatter: &TableFormatter) -> Result<()> {
    let rows = match name {
        Some(name) => vec![config.parameter_info(name)?],
        None => config.all_parameter_info(),
    };
    println!("{}", formatter.format_table(&rows)?);
    Ok(())
}

fn execute_get(
    config: &Config,
    name: &str,
    reveal: bool,
    format: OutputFormat,
    display: &DisplayUtils,
) -> Result<()> {
    let value = config.get(name)?;
    let shown = match &value {
        ParameterValue::Secret(secret) if reveal => secret.expose().to_string(),
        other => other.to_string(),
    };

    match format {
        OutputFormat::Json => {
            let rendered = match &value {
                ParameterValue::Secret(_) => serde_json::Value::String(shown),
                other => serde_json::to_value(other)?,
            };
            let json = serde_json::json!({
                "name": name,
                "type": value.type_name(),
                "value": rendered,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Raw => println!("{shown}"),
        OutputFormat::Table => {
            println!(
                "{}",
                display.format_key_value_pairs(&[
                    ("Name", name),
                    ("Type", value.type_name()),
                    ("Value", shown.as_str()),
                ])
            );
        }
    }
    Ok(())
}

fn execute_status(config: &Config, name: &str, formatter: &TableFormatter) -> Result<()> {
    // failed resolutions still leave per-source state behind
    if let Err(e) = config.get(name) {
        debug!("Resolution of {} failed: {}", name, e);
    }
    let rows = config.source_status(name)?;
    println!("{}", formatter.format_table(&rows)?);
    Ok(())
}
