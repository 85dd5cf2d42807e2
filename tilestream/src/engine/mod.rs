//! Engine facade.
//!
//! [`TileEngine`] owns one instance of every component and exposes the
//! operations a renderer needs each frame:
//!
//! ```text
//!  camera ──► visible_tiles() ──► resolve() ──► draw_order()
//!                                    │
//!                            miss ──►│ request()
//!                                    ▼
//!                           AdmissionController ──► DiskCache / fetcher
//!                                    │
//!                                    ▼
//!                 Debouncer ──► TileUploader ──► DecodedTileCache
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilestream::config::ConfigFile;
//! use tilestream::engine::TileEngineBuilder;
//!
//! let engine = TileEngineBuilder::new(ConfigFile::load()?, Arc::new(my_decoder))
//!     .on_tiles_changed(Arc::new(|| redraw()))
//!     .build()
//!     .await?;
//!
//! let visible = engine.visible_tiles(cx, cy, zoom);
//! for tile in engine.resolve(&visible, false).draw_order() {
//!     draw(tile);
//! }
//! ```

mod builder;
mod error;
mod stats;

pub use builder::TileEngineBuilder;
pub use error::EngineError;
pub use stats::EngineStats;

use std::sync::Arc;

use tracing::{info, trace, warn};

use crate::cache::{CacheStats, ClearResult, DecodedTileCache, DiskCache};
use crate::config::ConfigFile;
use crate::coord::TileId;
use crate::culling::Frustum;
use crate::pipeline::{AdmissionController, Debouncer, RequestOutcome, TileUploader};
use crate::provider::TileFetcher;
use crate::resolver::{ResolvedTiles, TileRequester, TileResolver};
use crate::tile::{MapPlacement, RawTile};
use crate::visible::VisibleTileGrid;

/// A running tile engine.
pub struct TileEngine<F: TileFetcher + 'static> {
    config: ConfigFile,
    grid: VisibleTileGrid,
    placement: MapPlacement,
    disk: Arc<DiskCache>,
    memory: Arc<DecodedTileCache>,
    admission: AdmissionController<F>,
    debouncer: Arc<Debouncer<RawTile>>,
    requester: Arc<EngineRequester<F>>,
    uploader: Arc<TileUploader>,
    resolver: TileResolver,
}

/// Admission in front of the decode window.
///
/// A fetched tile leaves the pending set before it is decoded. Until the
/// uploader has handled it, further requests would only fetch it again and
/// restart the debounce timer, so they stop here.
struct EngineRequester<F: TileFetcher + 'static> {
    admission: AdmissionController<F>,
    debouncer: Arc<Debouncer<RawTile>>,
}

impl<F: TileFetcher + 'static> EngineRequester<F> {
    fn request(&self, id: TileId) -> RequestOutcome {
        if self.debouncer.contains(&id) {
            trace!(tile = %id, "Tile awaiting decode");
            return RequestOutcome::AwaitingDecode;
        }
        self.admission.request(id)
    }
}

impl<F: TileFetcher + 'static> TileRequester for EngineRequester<F> {
    fn request(&self, id: TileId) {
        EngineRequester::request(self, id);
    }
}

impl<F: TileFetcher + 'static> TileEngine<F> {
    /// Splits visible tiles into decoded tiles and ancestor fallbacks,
    /// requesting the missing ones unless `cache_only` is set.
    pub fn resolve(&self, visible: &[TileId], cache_only: bool) -> ResolvedTiles {
        self.resolver.resolve(visible, cache_only)
    }

    /// Requests one tile directly.
    pub fn request(&self, id: TileId) -> RequestOutcome {
        self.requester.request(id)
    }

    pub fn visible_grid(&self) -> &VisibleTileGrid {
        &self.grid
    }

    /// Tiles around a fractional tile coordinate, nearest first.
    pub fn visible_tiles(&self, center_x: f64, center_y: f64, zoom: u8) -> Vec<TileId> {
        self.grid.tiles(center_x, center_y, zoom)
    }

    /// Like [`visible_tiles`](Self::visible_tiles), dropping tiles outside `frustum`.
    pub fn visible_tiles_in_view(
        &self,
        center_x: f64,
        center_y: f64,
        zoom: u8,
        frustum: &Frustum,
    ) -> Vec<TileId> {
        self.grid
            .tiles_in_view(center_x, center_y, zoom, frustum, &self.placement)
    }

    /// Changes the number of tiles kept per decode batch.
    pub fn set_visible_tile_count(&self, count: usize) {
        let capacity = self.admission.config().queue_capacity;
        if count > capacity {
            warn!(
                count,
                queue_capacity = capacity,
                "Visible tile count exceeds fetch queue capacity; bursts may drop requests"
            );
        }
        self.debouncer.set_batch_limit(count);
    }

    /// Decodes whatever is waiting in the debounce window now.
    ///
    /// Returns the number of tiles handed to the uploader.
    pub async fn flush(&self) -> usize {
        self.debouncer.flush().await
    }

    /// Deletes every downloaded tile. Decoded tiles stay resident.
    pub async fn purge_disk_cache(&self) -> Result<ClearResult, EngineError> {
        let result = self.disk.clear().await?;
        info!(
            files = result.files_removed,
            bytes = result.bytes_freed,
            "Disk tile cache purged"
        );
        Ok(result)
    }

    /// Drops every decoded tile.
    pub fn purge_decoded_cache(&self) {
        self.memory.clear();
        info!("Decoded tile cache purged");
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            cache: CacheStats::combine(&self.disk.stats(), &self.memory.stats()),
            admission: self.admission.stats(),
            debounce: self.debouncer.stats(),
            upload: self.uploader.stats(),
            pending: self.admission.pending_count(),
            queued: self.admission.queued_count(),
            awaiting_decode: self.debouncer.waiting_count(),
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn placement(&self) -> &MapPlacement {
        &self.placement
    }

    pub fn decoded_cache(&self) -> &Arc<DecodedTileCache> {
        &self.memory
    }

    pub fn disk_cache(&self) -> &Arc<DiskCache> {
        &self.disk
    }

    pub fn admission(&self) -> &AdmissionController<F> {
        &self.admission
    }

    /// Stops background work.
    ///
    /// Queued requests are discarded. Fetches already in flight finish and
    /// write to disk, but their bytes are no longer decoded.
    pub async fn shutdown(&self) {
        let discarded = self.admission.clear_queue();
        self.debouncer.shutdown().await;
        info!(
            discarded,
            in_flight = self.admission.pending_count(),
            "Tile engine stopped"
        );
    }
}
