//! Config command - View and check the Duffy configuration
//!
//! Provides the `duffy config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors
//! 3. Prints the configuration file location

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use duffy_core::config::Config;

use super::CliContext;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Validate configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, format: OutputFormat, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(format);
        match self {
            ConfigCommand::Show => show(&ctx.config, &ctx.config_path, format, &*formatter),
            ConfigCommand::Validate => validate(&ctx.config_path, format, &*formatter),
            ConfigCommand::Path => {
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "config_path": ctx.config_path.display().to_string(),
                        "exists": ctx.config_path.exists(),
                    }));
                } else {
                    println!("{}", ctx.config_path.display());
                }
                Ok(())
            }
        }
    }
}

fn show(
    config: &Config,
    config_path: &Path,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    info!(config_path = %config_path.display(), "Showing configuration");

    if format.is_json() {
        let json =
            serde_json::to_value(config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
        return Ok(());
    }

    formatter.success(&format!("Configuration ({})", config_path.display()));
    formatter.info("");
    let yaml =
        serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;
    for line in yaml.lines() {
        formatter.info(line);
    }
    Ok(())
}

/// Outcome of validating the file at a path
#[derive(Debug, PartialEq)]
enum Validation {
    NotFound,
    Unparsable(String),
    Invalid(Vec<String>),
    Valid,
}

fn check_file(config_path: &Path) -> Validation {
    if !config_path.exists() {
        return Validation::NotFound;
    }
    match Config::load(config_path) {
        Ok(config) => {
            let errors: Vec<String> = config.validate().iter().map(|e| e.to_string()).collect();
            if errors.is_empty() {
                Validation::Valid
            } else {
                Validation::Invalid(errors)
            }
        }
        Err(e) => Validation::Unparsable(format!("{:#}", e)),
    }
}

fn validate(config_path: &Path, format: OutputFormat, formatter: &dyn OutputFormatter) -> Result<()> {
    let outcome = check_file(config_path);

    if format.is_json() {
        let (valid, errors) = match &outcome {
            Validation::NotFound => (false, vec!["Configuration file not found. Using defaults.".to_string()]),
            Validation::Unparsable(e) => (false, vec![format!("Failed to parse configuration: {}", e)]),
            Validation::Invalid(errors) => (false, errors.clone()),
            Validation::Valid => (true, Vec::new()),
        };
        formatter.print_json(&serde_json::json!({
            "valid": valid,
            "config_path": config_path.display().to_string(),
            "errors": errors,
        }));
        return Ok(());
    }

    match outcome {
        Validation::NotFound => {
            formatter.info(&format!(
                "Configuration file not found at {}",
                config_path.display()
            ));
            formatter.info("Using default configuration.");
        }
        Validation::Unparsable(e) => {
            formatter.error(&format!("Failed to parse configuration: {}", e));
            formatter.info(&format!("File: {}", config_path.display()));
        }
        Validation::Invalid(errors) => {
            formatter.error(&format!("Configuration has {} error(s):", errors.len()));
            for e in &errors {
                formatter.info(&format!("  - {}", e));
            }
        }
        Validation::Valid => {
            formatter.success(&format!("Configuration is valid ({})", config_path.display()));
        }
    }
    Ok(())
}
