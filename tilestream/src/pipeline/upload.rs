//! Decode and upload of debounced batches.
//!
//! [`TileUploader`] is the batch handler behind the debouncer. For each raw
//! tile it decodes geometry, creates the four device buffers, and publishes
//! the resulting [`DecodedTile`] into the decoded tile cache. A tile that
//! fails is logged and skipped; the rest of the batch carries on.

use crate::cache::DecodedTileCache;
use crate::coord::TileId;
use crate::decode::{DecodeError, MapStyle, TileDecoder};
use crate::gpu::{BufferUsage, GpuError, GraphicsDevice};
use crate::tile::{DecodedTile, MapPlacement, RawTile};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

/// Zero-argument "tiles changed, redraw" signal.
pub type TilesChangedCallback = Arc<dyn Fn() + Send + Sync>;

/// Errors for a single tile upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to decode tile {tile}: {source}")]
    Decode {
        tile: TileId,
        #[source]
        source: DecodeError,
    },

    #[error("failed to upload tile {tile}: {source}")]
    Gpu {
        tile: TileId,
        #[source]
        source: GpuError,
    },
}

/// Outcome of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub uploaded: Vec<TileId>,
    pub failed: Vec<TileId>,
}

/// Upload counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadStats {
    /// Batches processed
    pub batches: u64,
    /// Tiles decoded, uploaded and cached
    pub uploaded: u64,
    /// Tiles that failed to decode
    pub decode_failures: u64,
    /// Tiles whose buffers could not be created
    pub gpu_failures: u64,
    /// Device bytes allocated for uploaded tiles
    pub bytes_uploaded: u64,
    /// Wall time of the most recent batch, in milliseconds
    pub last_batch_ms: u64,
}

/// Turns raw tile bytes into cached, drawable tiles.
pub struct TileUploader {
    device: Arc<dyn GraphicsDevice>,
    decoder: Arc<dyn TileDecoder>,
    style: Arc<dyn MapStyle>,
    placement: MapPlacement,
    cache: Arc<DecodedTileCache>,
    on_tiles_changed: Option<TilesChangedCallback>,
    stats: Mutex<UploadStats>,
}

impl TileUploader {
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        decoder: Arc<dyn TileDecoder>,
        style: Arc<dyn MapStyle>,
        cache: Arc<DecodedTileCache>,
    ) -> Self {
        Self {
            device,
            decoder,
            style,
            placement: MapPlacement::default(),
            cache,
            on_tiles_changed: None,
            stats: Mutex::new(UploadStats::default()),
        }
    }

    pub fn with_placement(mut self, placement: MapPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_tiles_changed(mut self, callback: TilesChangedCallback) -> Self {
        self.on_tiles_changed = Some(callback);
        self
    }

    pub fn placement(&self) -> &MapPlacement {
        &self.placement
    }

    /// Decodes and uploads one tile without caching it.
    pub fn upload(&self, raw: &RawTile) -> Result<DecodedTile, UploadError> {
        let id = raw.id;
        let parsed = self
            .decoder
            .decode(id, &raw.bytes, self.style.as_ref())
            .map_err(|source| UploadError::Decode { tile: id, source })?;

        let model = self.placement.model_matrix(id);
        let gpu = |source| UploadError::Gpu { tile: id, source };

        let vertex_buffer = self
            .device
            .create_buffer(
                &format!("{id} vertices"),
                bytemuck::cast_slice(&parsed.vertices),
                BufferUsage::Vertex,
            )
            .map_err(gpu)?;
        let index_buffer = self
            .device
            .create_buffer(
                &format!("{id} indices"),
                bytemuck::cast_slice(&parsed.indices),
                BufferUsage::Index,
            )
            .map_err(gpu)?;
        let style_buffer = self
            .device
            .create_buffer(
                &format!("{id} styles"),
                bytemuck::cast_slice(&parsed.styles),
                BufferUsage::Uniform,
            )
            .map_err(gpu)?;
        let model_matrix_buffer = self
            .device
            .create_buffer(
                &format!("{id} model"),
                bytemuck::bytes_of(&model),
                BufferUsage::Uniform,
            )
            .map_err(gpu)?;

        Ok(DecodedTile {
            id,
            vertex_buffer,
            index_buffer,
            index_count: parsed.indices.len() as u32,
            style_buffer,
            model_matrix_buffer,
        })
    }

    /// Uploads a batch and publishes every success into the decoded cache.
    ///
    /// Signals the tiles-changed callback once if anything was published.
    pub fn process_batch(&self, batch: Vec<RawTile>) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport::default();
        let mut bytes_uploaded = 0u64;
        let mut decode_failures = 0u64;
        let mut gpu_failures = 0u64;

        for raw in &batch {
            match self.upload(raw) {
                Ok(tile) => {
                    bytes_uploaded += tile.cost_bytes() as u64;
                    self.cache.insert(tile);
                    report.uploaded.push(raw.id);
                }
                Err(e) => {
                    warn!(tile = %raw.id, error = %e, "Skipping tile");
                    match e {
                        UploadError::Decode { .. } => decode_failures += 1,
                        UploadError::Gpu { .. } => gpu_failures += 1,
                    }
                    report.failed.push(raw.id);
                }
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        {
            let mut stats = self.stats.lock();
            stats.batches += 1;
            stats.uploaded += report.uploaded.len() as u64;
            stats.decode_failures += decode_failures;
            stats.gpu_failures += gpu_failures;
            stats.bytes_uploaded += bytes_uploaded;
            stats.last_batch_ms = elapsed_ms;
        }

        debug!(
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            bytes = bytes_uploaded,
            elapsed_ms,
            device = self.device.name(),
            "Batch uploaded"
        );

        if !report.uploaded.is_empty() {
            if let Some(callback) = &self.on_tiles_changed {
                callback();
            }
        }

        report
    }

    pub fn stats(&self) -> UploadStats {
        self.stats.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheConfig;
    use crate::decode::{DefaultMapStyle, ParsedTile, PolygonVertex, StyleUniform};
    use crate::gpu::HostDevice;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Emits one triangle per tile, or fails on bytes starting with 0xFF.
    fn triangle_decoder() -> Arc<dyn TileDecoder> {
        Arc::new(|_id: TileId, bytes: &[u8], _style: &dyn MapStyle| {
            if bytes.first() == Some(&0xFF) {
                return Err(DecodeError::Malformed("bad header".into()));
            }
            let vertex = |x, y| PolygonVertex {
                position: [x, y],
                style_index: 0,
            };
            Ok(ParsedTile {
                vertices: vec![vertex(-1.0, -1.0), vertex(1.0, -1.0), vertex(0.0, 1.0)],
                indices: vec![0, 1, 2],
                styles: vec![StyleUniform {
                    color: [0.0, 0.0, 1.0, 1.0],
                }],
                labels: Vec::new(),
            })
        })
    }

    fn uploader(cache: Arc<DecodedTileCache>) -> TileUploader {
        TileUploader::new(
            Arc::new(HostDevice::new()),
            triangle_decoder(),
            Arc::new(DefaultMapStyle::new()),
            cache,
        )
    }

    fn cache() -> Arc<DecodedTileCache> {
        Arc::new(DecodedTileCache::new(MemoryCacheConfig::new(1024 * 1024)))
    }

    #[test]
    fn test_upload_builds_all_buffers() {
        let uploader = uploader(cache());
        let tile = uploader.upload(&RawTile::new(TileId::new(1, 1, 2), vec![1])).unwrap();

        assert_eq!(tile.index_count, 3);
        assert_eq!(tile.vertex_buffer.len(), 36);
        assert_eq!(tile.index_buffer.len(), 12);
        assert_eq!(tile.style_buffer.len(), 16);
        assert_eq!(tile.model_matrix_buffer.len(), 64);
        assert_eq!(tile.model_matrix_buffer.usage(), BufferUsage::Uniform);
    }

    #[test]
    fn test_zoom_beyond_pyramid_uploads_without_panic() {
        let cache = cache();
        let uploader = uploader(Arc::clone(&cache));
        let deep = TileId::new(0, 0, 70);

        let report = uploader.process_batch(vec![RawTile::new(deep, vec![1])]);

        assert_eq!(report.uploaded, vec![deep]);
        assert!(cache.contains(&deep));
    }

    #[test]
    fn test_batch_skips_failed_tiles() {
        let cache = cache();
        let redraws = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&redraws);
        let uploader = uploader(Arc::clone(&cache)).with_tiles_changed(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let good = TileId::new(0, 0, 1);
        let bad = TileId::new(1, 0, 1);
        let also_good = TileId::new(1, 1, 1);
        let report = uploader.process_batch(vec![
            RawTile::new(good, vec![1]),
            RawTile::new(bad, vec![0xFF]),
            RawTile::new(also_good, vec![2]),
        ]);

        assert_eq!(report.uploaded, vec![good, also_good]);
        assert_eq!(report.failed, vec![bad]);
        assert!(cache.contains(&good));
        assert!(!cache.contains(&bad));
        assert_eq!(redraws.load(Ordering::SeqCst), 1);

        let stats = uploader.stats();
        assert_eq!(stats.batches, 1);
        assert_eq!(stats.uploaded, 2);
        assert_eq!(stats.decode_failures, 1);
    }

    #[test]
    fn test_all_failures_skip_redraw() {
        let redraws = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&redraws);
        let uploader = uploader(cache()).with_tiles_changed(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        uploader.process_batch(vec![RawTile::new(TileId::new(0, 0, 0), vec![0xFF])]);

        assert_eq!(redraws.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_gpu_failure_is_isolated() {
        let cache = cache();
        let uploader = TileUploader::new(
            Arc::new(HostDevice::new().with_max_buffer_size(32)),
            triangle_decoder(),
            Arc::new(DefaultMapStyle::new()),
            Arc::clone(&cache),
        );

        let report = uploader.process_batch(vec![RawTile::new(TileId::new(0, 0, 0), vec![1])]);

        assert_eq!(report.failed.len(), 1);
        assert!(cache.is_empty());
        assert_eq!(uploader.stats().gpu_failures, 1);
    }

    #[test]
    fn test_model_matrix_matches_placement() {
        let uploader = uploader(cache()).with_placement(MapPlacement::new(2000.0));
        let id = TileId::new(0, 0, 1);
        let tile = uploader.upload(&RawTile::new(id, vec![1])).unwrap();

        let buffer = tile
            .model_matrix_buffer
            .as_any()
            .downcast_ref::<crate::gpu::HostBuffer>()
            .unwrap();
        let expected = uploader.placement().model_matrix(id);
        assert_eq!(buffer.contents(), bytemuck::bytes_of(&expected));
    }
}
