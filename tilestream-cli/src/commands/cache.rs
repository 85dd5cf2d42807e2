//! Cache management CLI commands.

use std::path::Path;

use clap::Subcommand;
use tilestream::config::{format_duration, format_size};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Clear the disk cache, removing all downloaded tiles
    Clear,
    /// Show disk cache statistics
    Stats,
    /// Remove tiles older than the configured disk_ttl
    Prune,
}

/// Run a cache subcommand.
pub async fn run(action: CacheAction, config_path: Option<&Path>) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path, false)?;
    let disk = runner.open_disk_cache().await?;

    match action {
        CacheAction::Clear => {
            println!("Clearing disk cache at: {}", disk.directory().display());
            let result = disk.clear().await?;
            println!(
                "Deleted {} files, freed {}",
                result.files_removed,
                format_size(result.bytes_freed)
            );
        }
        CacheAction::Stats => {
            let usage = disk.usage().await?;
            println!("Disk cache: {}", disk.directory().display());
            println!("  Files: {}", usage.files);
            println!("  Size:  {}", format_size(usage.bytes));
            println!("  TTL:   {}", format_duration(disk.ttl()));
            println!(
                "Decoded tile budget: {}",
                format_size(runner.config().cache.memory_budget)
            );
        }
        CacheAction::Prune => {
            println!(
                "Pruning tiles older than {} from: {}",
                format_duration(disk.ttl()),
                disk.directory().display()
            );
            let result = disk.evict_expired().await?;
            println!(
                "Deleted {} expired files, freed {}",
                result.files_removed,
                format_size(result.bytes_freed)
            );
        }
    }

    Ok(())
}
