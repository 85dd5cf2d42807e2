//! Tile payloads as they move through the engine.
//!
//! - [`RawTile`] - fetched bytes, produced by the disk cache or the network
//! - [`DecodedTile`] - device buffers ready to draw, owned by the decoded cache
//! - [`MapPlacement`] - where a tile sits in world space

mod placement;

pub use placement::{MapPlacement, DEFAULT_MAP_SIZE};

use crate::coord::TileId;
use crate::gpu::DeviceBuffer;
use crate::pipeline::Debounced;
use bytes::Bytes;
use std::sync::Arc;

/// Undecoded tile bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTile {
    pub id: TileId,
    pub bytes: Bytes,
}

impl RawTile {
    pub fn new(id: TileId, bytes: impl Into<Bytes>) -> Self {
        Self {
            id,
            bytes: bytes.into(),
        }
    }
}

impl Debounced for RawTile {
    type Key = TileId;

    fn key(&self) -> TileId {
        self.id
    }
}

/// A tile decoded and uploaded to the graphics device.
///
/// Immutable once built. The decoded cache hands out `Arc<DecodedTile>` and
/// the renderer only ever reads it.
#[derive(Debug, Clone)]
pub struct DecodedTile {
    pub id: TileId,
    pub vertex_buffer: Arc<dyn DeviceBuffer>,
    pub index_buffer: Arc<dyn DeviceBuffer>,
    /// Number of indices to draw.
    pub index_count: u32,
    pub style_buffer: Arc<dyn DeviceBuffer>,
    pub model_matrix_buffer: Arc<dyn DeviceBuffer>,
}

impl DecodedTile {
    /// All device buffers held by the tile.
    pub fn buffers(&self) -> [&Arc<dyn DeviceBuffer>; 4] {
        [
            &self.vertex_buffer,
            &self.index_buffer,
            &self.style_buffer,
            &self.model_matrix_buffer,
        ]
    }

    /// Device memory charged to this tile: the sum of its buffers'
    /// allocated sizes.
    pub fn cost_bytes(&self) -> usize {
        self.buffers().iter().map(|b| b.allocated_size()).sum()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::decoded_tile;
    use super::*;

    #[test]
    fn test_cost_sums_allocated_sizes() {
        let tile = decoded_tile(TileId::new(0, 0, 0), 256);
        assert_eq!(tile.cost_bytes(), 256);
        assert_eq!(tile.buffers().len(), 4);
    }

    #[test]
    fn test_raw_tile_from_vec() {
        let raw = RawTile::new(TileId::new(1, 0, 1), vec![1, 2, 3]);
        assert_eq!(raw.bytes.as_ref(), &[1, 2, 3]);
    }
}
