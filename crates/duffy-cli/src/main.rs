//! Duffy CLI - Command-line interface for Duffy
//!
//! Provides commands for:
//! - Viewing today's cached steps and the past week
//! - Changing the daily step goal
//! - Refreshing today's steps on demand
//! - Inspecting the configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{
    config::ConfigCommand, goal::GoalCommand, refresh::RefreshCommand, status::StatusCommand,
    week::WeekCommand, CliContext,
};
use duffy_core::config::Config;
use duffy_daemon::logging;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "duffy", version, about = "Daily step count companion")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show today's steps and goal
    Status(StatusCommand),
    /// Show the past week of steps
    Week(WeekCommand),
    /// Set the daily step goal
    Goal(GoalCommand),
    /// Fetch today's steps now
    Refresh(RefreshCommand),
    /// View and check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    let level = logging::level_for_verbosity(&config.logging.level, cli.verbose).to_string();
    logging::init(&config.logging, &level, false);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CliContext::new(config_path, config);

    match cli.command {
        Commands::Status(cmd) => cmd.execute(format, &ctx).await,
        Commands::Week(cmd) => cmd.execute(format, &ctx).await,
        Commands::Goal(cmd) => cmd.execute(format, &ctx).await,
        Commands::Refresh(cmd) => cmd.execute(format, &ctx).await,
        Commands::Config(cmd) => cmd.execute(format, &ctx).await,
    }
}
