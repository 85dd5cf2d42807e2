//! Per-frame tile visibility memo.

use super::Frustum;
use crate::coord::TileId;
use crate::tile::MapPlacement;
use glam::Mat4;
use std::collections::HashMap;

/// Placement and visibility of one tile for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTile {
    pub model_matrix: Mat4,
    pub visible: bool,
}

/// Caches each tile's model matrix and frustum test for one frame.
///
/// The render loop asks about the same tiles several times per frame
/// (visible set, fallbacks, labels); the answers only change when the
/// camera does. Call [`begin_frame`](Self::begin_frame) whenever a new
/// frustum is derived.
#[derive(Debug)]
pub struct FrameTileCache {
    frustum: Frustum,
    placement: MapPlacement,
    tiles: HashMap<TileId, FrameTile>,
}

impl FrameTileCache {
    pub fn new(frustum: Frustum, placement: MapPlacement) -> Self {
        Self {
            frustum,
            placement,
            tiles: HashMap::new(),
        }
    }

    /// Installs the next frame's camera and forgets all memoised tiles.
    pub fn begin_frame(&mut self, frustum: Frustum, placement: MapPlacement) {
        self.frustum = frustum;
        self.placement = placement;
        self.tiles.clear();
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn get(&mut self, id: TileId) -> FrameTile {
        let frustum = &self.frustum;
        let placement = &self.placement;
        *self.tiles.entry(id).or_insert_with(|| {
            let model_matrix = placement.model_matrix(id);
            let visible = frustum.contains(&placement.bounds(id));
            FrameTile {
                model_matrix,
                visible,
            }
        })
    }

    pub fn is_visible(&mut self, id: TileId) -> bool {
        self.get(id).visible
    }

    /// Number of tiles evaluated this frame.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
