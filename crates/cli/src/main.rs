//! Steadyhand CLI, the main entry point.
//!
//! Commands:
//! - `run`           Connect and keep the agent in the world
//! - `check-config`  Load and validate the configuration
//! - `init`          Write a default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "steadyhand",
    about = "Steadyhand: an always-on in-world agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./steadyhand.toml)
    #[arg(short, long, global = true, env = "STEADYHAND_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and keep the agent in the world
    Run {
        /// Don't start the liveness endpoint
        #[arg(long)]
        no_gateway: bool,

        /// Seed every random draw, for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Load and validate the configuration
    CheckConfig,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config_path = cli
        .config
        .unwrap_or_else(steadyhand_config::AppConfig::default_path);

    match cli.command {
        Commands::Run { no_gateway, seed } => {
            commands::run::run(&config_path, !no_gateway, seed).await?
        }
        Commands::CheckConfig => commands::check::run(&config_path)?,
        Commands::Init { force } => commands::init::run(&config_path, force)?,
    }

    Ok(())
}
