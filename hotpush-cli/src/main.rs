//! hotpush CLI - Command-line interface
//!
//! Drives the hotpush library against a local version store: check the
//! origin for updates, inspect the lifecycle state, mark a startup as
//! successful, and resolve URL paths to the files that would be served.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hotpush::logging::init_logging;

mod commands;
mod error;

use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "hotpush", version, about = "Hot code push for packaged web applications")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "hotpush=debug" (overrides the config file)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check the origin for a new version and download it
    Check {
        /// Root URL of the app (defaults to the configured or persisted one)
        #[arg(long)]
        root_url: Option<String>,
    },

    /// Show the persisted lifecycle state and the downloaded versions
    Status,

    /// Mark startup of the current version as successful and prune old versions
    Complete,

    /// Print the file that would be served for a URL path
    Resolve {
        /// URL path, e.g. /app.js or /some/client/route
        url_path: String,
    },

    /// View or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        config,
        log,
        command,
    } = cli;

    let command = match command {
        Commands::Config(command) => return commands::config::run(command, config.as_deref()),
        other => other,
    };

    let file = commands::common::load_config(config.as_deref())?;
    init_logging(log.as_deref().or(file.logging.filter.as_deref()));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Config(format!("Failed to start async runtime: {}", e)))?;

    runtime.block_on(async move {
        match command {
            Commands::Check { root_url } => commands::check::run(&file, root_url).await,
            Commands::Status => commands::status::run(&file),
            Commands::Complete => commands::complete::run(&file).await,
            Commands::Resolve { url_path } => commands::resolve::run(&file, &url_path),
            Commands::Config(_) => Ok(()),
        }
    })
}
