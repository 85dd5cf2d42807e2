//! Single tile download.

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::info;
use tilestream::config::format_size;
use tilestream::coord::TileId;
use tilestream::provider::TileFetcher;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for `tilestream fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Zoom level
    #[arg(long)]
    pub zoom: u8,

    /// Tile column
    #[arg(long)]
    pub x: u32,

    /// Tile row (0 at the north edge)
    #[arg(long)]
    pub y: u32,

    /// Write the tile bytes to this file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Download even if a fresh copy is on disk
    #[arg(long)]
    pub refresh: bool,
}

/// Fetches one tile through the disk cache.
pub async fn run(args: FetchArgs, config_path: Option<&Path>, debug: bool) -> Result<(), CliError> {
    let tile = TileId::checked(args.x, args.y, args.zoom)?;

    let runner = CliRunner::new(config_path, debug)?;
    runner.log_startup("fetch");

    let disk = runner.open_disk_cache().await?;

    let cached = if args.refresh {
        None
    } else {
        disk.get(tile).await
    };

    let (bytes, source) = match cached {
        Some(bytes) => (bytes, "disk cache"),
        None => {
            let fetcher = runner.create_fetcher()?;
            println!("Downloading tile {} from {}...", tile, fetcher.name());
            let bytes = fetcher.fetch(tile).await?;
            disk.put(tile, &bytes).await?;
            (bytes, "network")
        }
    };

    info!(tile = %tile, bytes = bytes.len(), source, "Tile fetched");
    println!(
        "Tile {} ({}) from {}",
        tile,
        format_size(bytes.len() as u64),
        source
    );
    println!("  Cached at: {}", disk.path_for(tile).display());

    if let Some(path) = args.output {
        std::fs::write(&path, &bytes).map_err(|error| CliError::Io {
            path: path.clone(),
            error,
        })?;
        println!("  Saved to:  {}", path.display());
    }

    Ok(())
}
