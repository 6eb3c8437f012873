mod commands;
mod config;
mod context;
mod logging;
mod messages;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::commands::Commands;
use crate::config::AppConfig;

/// Rollcall - attendance tracking from the command line
#[derive(Parser)]
#[command(name = "rollcall")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file [default: ~/.rollcall/config.yaml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Layered config:
    // 1) defaults -> 2) YAML (if present) -> 3) env (ROLLCALL__*) -> 4) CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.verbose);

    let _log_guard = logging::init(&config.logging)?;
    tracing::debug!(storage = %config.storage.dir.display(), "configuration loaded");

    cli.command.run(&config).await
}
