//! stepwise CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Interactive session or single-message mode (default)
//! - `tools`   — List the tools the model can call
//! - `doctor`  — Diagnose config, credentials and provider reachability

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use stepwise_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "stepwise",
    about = "stepwise — a step-by-step tool-using agent for the terminal",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (default: ~/.stepwise/config.toml)
    #[arg(short, long, global = true, env = "STEPWISE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List the available tools
    Tools,

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // stdout carries the session; logs go to stderr.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command.unwrap_or(Commands::Chat { message: None }) {
        Commands::Chat { message } => commands::chat::run(load_config(config_path)?, message).await?,
        Commands::Tools => commands::tools::run(&load_config(config_path)?),
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}

/// Load the config from `path`, or from the default location.
pub(crate) fn load_config(path: Option<&Path>) -> Result<AppConfig, String> {
    let loaded = match path {
        Some(path) => AppConfig::load_with_overrides(path),
        None => AppConfig::load(),
    };
    loaded.map_err(|e| format!("Failed to load config: {e}"))
}
