//! tilestream CLI - Command-line interface
//!
//! This binary provides tile download and cache maintenance on top of the
//! tilestream library.

mod commands;
mod error;
mod runner;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use commands::prefetch::PrefetchArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "tilestream")]
#[command(version = tilestream::VERSION)]
#[command(about = "Download and cache vector map tiles", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.tilestream/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download a single tile through the disk cache
    Fetch(FetchArgs),

    /// Download every visible tile around a location
    Prefetch(PrefetchArgs),

    /// Manage the disk tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config { command } => commands::config::run(command, config_path),
        command => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|e| CliError::Runtime(format!("Failed to start async runtime: {}", e)))?;
            runtime.block_on(run_async(command, config_path, cli.debug))
        }
    }
}

async fn run_async(
    command: Commands,
    config_path: Option<&Path>,
    debug: bool,
) -> Result<(), CliError> {
    match command {
        Commands::Fetch(args) => commands::fetch::run(args, config_path, debug).await,
        Commands::Prefetch(args) => commands::prefetch::run(args, config_path, debug).await,
        Commands::Cache { action } => commands::cache::run(action, config_path).await,
        Commands::Config { command } => commands::config::run(command, config_path),
    }
}
