//! Visible tile set around the camera.
//!
//! Produces the ordered tile list the resolver consumes each frame: a
//! `(2r + 1)²` window of tiles around the camera's fractional tile position,
//! nearest first. Zooms past the deepest zoom the provider serves are
//! clamped to the ancestor at that zoom. Rows are shifted to stay on the map
//! while columns wrap around the antimeridian.

use crate::coord::{fractional_tile, CoordError, TileId, MAX_ZOOM};
use crate::culling::Frustum;
use crate::tile::MapPlacement;
use std::collections::HashSet;

/// Default grid radius in tiles.
pub const DEFAULT_TILES_IN_DIRECTION: u32 = 1;

/// Default deepest zoom requested from the provider.
pub const DEFAULT_MAX_TILE_ZOOM: u8 = 16;

/// Number of tiles a grid of `radius` yields at most.
pub fn visible_tile_count(radius: u32) -> usize {
    let side = 2 * radius as usize + 1;
    side * side
}

/// Builds visible tile lists for a fixed radius and zoom cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleTileGrid {
    radius: u32,
    max_tile_zoom: u8,
}

impl Default for VisibleTileGrid {
    fn default() -> Self {
        Self::new(DEFAULT_TILES_IN_DIRECTION, DEFAULT_MAX_TILE_ZOOM)
    }
}

impl VisibleTileGrid {
    pub fn new(radius: u32, max_tile_zoom: u8) -> Self {
        Self {
            radius,
            max_tile_zoom: max_tile_zoom.min(MAX_ZOOM),
        }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn max_tile_zoom(&self) -> u8 {
        self.max_tile_zoom
    }

    /// Upper bound on the number of tiles returned by [`tiles`](Self::tiles).
    pub fn tile_count(&self) -> usize {
        visible_tile_count(self.radius)
    }

    /// Tiles around the fractional tile position `(center_x, center_y)` at
    /// `zoom`, nearest first.
    pub fn tiles(&self, center_x: f64, center_y: f64, zoom: u8) -> Vec<TileId> {
        let zoom = zoom.min(MAX_ZOOM);
        let (center_x, center_y, z) = if zoom > self.max_tile_zoom {
            let scale = (1u64 << (zoom - self.max_tile_zoom)) as f64;
            (center_x / scale, center_y / scale, self.max_tile_zoom)
        } else {
            (center_x, center_y, zoom)
        };

        let last = TileId::tiles_per_side(z) as i64 - 1;
        let radius = self.radius as i64;
        let cx = center_x.floor() as i64;
        let cy = (center_y.floor() as i64).clamp(0, last);

        let mut start_y = cy - radius;
        let mut end_y = cy + radius;
        if start_y < 0 {
            end_y -= start_y;
            start_y = 0;
        } else if end_y > last {
            start_y -= end_y - last;
            end_y = last;
        }
        let start_y = start_y.max(0);
        let end_y = end_y.min(last);

        let mut seen = HashSet::new();
        let mut tiles = Vec::with_capacity(self.tile_count());
        for dx in -radius..=radius {
            for y in start_y..=end_y {
                let id = TileId::new(TileId::wrap_x(cx + dx, z), y as u32, z);
                if seen.insert(id) {
                    let dy = y - cy;
                    tiles.push((dx * dx + dy * dy, id));
                }
            }
        }

        tiles.sort_by_key(|&(distance, id)| (distance, id.y, id.x));
        tiles.into_iter().map(|(_, id)| id).collect()
    }

    /// Tiles around a geographic position.
    pub fn tiles_at(&self, lat: f64, lon: f64, zoom: u8) -> Result<Vec<TileId>, CoordError> {
        let (x, y) = fractional_tile(lat, lon, zoom)?;
        Ok(self.tiles(x, y, zoom))
    }

    /// [`tiles`](Self::tiles) filtered to quads inside `frustum`.
    pub fn tiles_in_view(
        &self,
        center_x: f64,
        center_y: f64,
        zoom: u8,
        frustum: &Frustum,
        placement: &MapPlacement,
    ) -> Vec<TileId> {
        self.tiles(center_x, center_y, zoom)
            .into_iter()
            .filter(|&id| frustum.contains(&placement.bounds(id)))
            .collect()
    }
}
