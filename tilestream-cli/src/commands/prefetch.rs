//! Warms the disk cache around a location.
//!
//! Runs the same admission controller the engine uses, so the concurrency
//! ceiling and deduplication from `[fetch]` apply.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use clap::Args;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tilestream::coord::TileId;
use tilestream::pipeline::{AdmissionController, FetchCallback, RequestOutcome};
use tilestream::visible::VisibleTileGrid;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for `tilestream prefetch`.
#[derive(Debug, Args)]
pub struct PrefetchArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Zoom level
    #[arg(long)]
    pub zoom: u8,

    /// Tiles in each direction around the center (default: view.tiles_in_direction)
    #[arg(long)]
    pub radius: Option<u32>,

    /// Also fetch every ancestor of the center tile
    #[arg(long)]
    pub ancestors: bool,

    /// Give up waiting after this many seconds
    #[arg(long, default_value = "120")]
    pub timeout: u64,
}

/// Tally of request outcomes and completions.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PrefetchSummary {
    pub started: usize,
    pub queued: usize,
    pub dropped: usize,
    pub skipped: usize,
    pub fetched: usize,
    pub failed: usize,
}

impl PrefetchSummary {
    /// Records one `request` outcome.
    pub fn record(&mut self, outcome: RequestOutcome) {
        match outcome {
            RequestOutcome::Started => self.started += 1,
            RequestOutcome::Queued => self.queued += 1,
            RequestOutcome::Dropped => self.dropped += 1,
            RequestOutcome::AlreadyPending
            | RequestOutcome::AlreadyQueued
            | RequestOutcome::CoolingDown
            | RequestOutcome::AwaitingDecode => self.skipped += 1,
        }
    }

    /// Completions still outstanding.
    pub fn outstanding(&self) -> usize {
        (self.started + self.queued).saturating_sub(self.fetched + self.failed)
    }
}

/// Tiles to prefetch: the visible grid, then optionally the ancestors.
pub fn plan(
    grid: &VisibleTileGrid,
    lat: f64,
    lon: f64,
    zoom: u8,
    ancestors: bool,
) -> Result<Vec<TileId>, CliError> {
    let mut tiles = grid.tiles_at(lat, lon, zoom)?;
    if ancestors {
        if let Some(center) = tiles.first().copied() {
            tiles.extend(center.ancestors());
        }
    }
    Ok(tiles)
}

pub async fn run(
    args: PrefetchArgs,
    config_path: Option<&Path>,
    debug: bool,
) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path, debug)?;
    runner.log_startup("prefetch");
    let config = runner.config();

    let radius = args.radius.unwrap_or(config.view.tiles_in_direction);
    let grid = VisibleTileGrid::new(radius, config.view.max_tile_zoom);
    let tiles = plan(&grid, args.lat, args.lon, args.zoom, args.ancestors)?;

    let disk = runner.open_disk_cache().await?;
    let fetcher = Arc::new(runner.create_fetcher()?);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let on_complete: FetchCallback = Arc::new(move |id: TileId, bytes: Option<Bytes>| {
        let _ = tx.send((id, bytes.is_some()));
    });

    // Every planned tile must fit in the queue, whatever the configured capacity.
    let mut admission_config = config.admission_config();
    admission_config.queue_capacity = admission_config.queue_capacity.max(tiles.len());

    let controller = AdmissionController::new(
        admission_config,
        disk,
        fetcher,
        on_complete,
        Handle::current(),
    );

    println!(
        "Prefetching {} tiles around {:.5}, {:.5} at zoom {}",
        tiles.len(),
        args.lat,
        args.lon,
        args.zoom
    );

    let started = Instant::now();
    let mut summary = PrefetchSummary::default();
    for &tile in &tiles {
        summary.record(controller.request(tile));
    }

    let deadline = tokio::time::sleep(Duration::from_secs(args.timeout));
    tokio::pin!(deadline);

    while summary.outstanding() > 0 {
        tokio::select! {
            completion = rx.recv() => match completion {
                Some((_, true)) => summary.fetched += 1,
                Some((tile, false)) => {
                    summary.failed += 1;
                    warn!(tile = %tile, "Prefetch failed");
                }
                None => break,
            },
            _ = &mut deadline => {
                warn!(outstanding = summary.outstanding(), "Prefetch timed out");
                println!("Timed out with {} tiles outstanding", summary.outstanding());
                break;
            }
        }
    }

    let stats = controller.stats();
    info!(
        fetched = summary.fetched,
        failed = summary.failed,
        disk_hits = stats.disk_hits,
        network = stats.network_fetches,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Prefetch complete"
    );

    println!();
    println!("Fetched:   {}", summary.fetched);
    println!("  from disk:    {}", stats.disk_hits);
    println!("  from network: {}", stats.network_fetches);
    println!("Failed:    {}", summary.failed);
    if summary.dropped > 0 {
        println!("Dropped:   {}", summary.dropped);
    }
    if summary.skipped > 0 {
        println!("Skipped:   {}", summary.skipped);
    }
    println!("Elapsed:   {:.1}s", started.elapsed().as_secs_f64());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_outstanding() {
        let mut summary = PrefetchSummary::default();
        summary.record(RequestOutcome::Started);
        summary.record(RequestOutcome::Queued);
        summary.record(RequestOutcome::AlreadyPending);
        summary.record(RequestOutcome::Dropped);
        assert_eq!(summary.outstanding(), 2);

        summary.fetched = 1;
        summary.failed = 1;
        assert_eq!(summary.outstanding(), 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.dropped, 1);
    }

    #[test]
    fn test_plan_with_ancestors() {
        let grid = VisibleTileGrid::new(1, 16);
        let tiles = plan(&grid, 51.5, -0.12, 10, true).unwrap();

        assert_eq!(tiles.len(), 9 + 10);
        let center = tiles[0];
        assert_eq!(center.z, 10);
        assert_eq!(tiles.last().copied(), Some(TileId::new(0, 0, 0)));
    }

    #[test]
    fn test_plan_rejects_bad_latitude() {
        let grid = VisibleTileGrid::default();
        assert!(matches!(
            plan(&grid, 89.9, 0.0, 4, false),
            Err(CliError::Coord(_))
        ));
    }
}
