//! World-space placement of tiles.

use crate::coord::TileId;
use crate::culling::TileBounds;
use glam::{DVec2, Mat4, Vec2, Vec3};

/// Side length of the flat world map in world units.
pub const DEFAULT_MAP_SIZE: f32 = 1000.0;

/// Maps tiles onto a square world map centred on the origin.
///
/// Each tile's geometry lives in a local `[-1, 1]²` square; the model matrix
/// scales it by half the tile size and moves it to the tile centre. North is
/// `+y`, so row 0 sits at the top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapPlacement {
    map_size: f64,
    pan: DVec2,
}

impl Default for MapPlacement {
    fn default() -> Self {
        Self::new(DEFAULT_MAP_SIZE)
    }
}

impl MapPlacement {
    pub fn new(map_size: f32) -> Self {
        Self {
            map_size: map_size as f64,
            pan: DVec2::ZERO,
        }
    }

    /// Offsets every tile by a camera pan.
    pub fn with_pan(mut self, pan: Vec2) -> Self {
        self.pan = pan.as_dvec2();
        self
    }

    pub fn map_size(&self) -> f32 {
        self.map_size as f32
    }

    /// Side length of one tile at zoom `z`.
    pub fn tile_size(&self, z: u8) -> f64 {
        self.map_size / TileId::tiles_per_side(z) as f64
    }

    /// World-space centre of a tile, including pan.
    pub fn tile_center(&self, id: TileId) -> Vec2 {
        let size = self.tile_size(id.z);
        let half_map = self.map_size / 2.0;
        let x = (id.x as f64 + 0.5) * size - half_map;
        let y = half_map - (id.y as f64 + 0.5) * size;
        (DVec2::new(x, y) + self.pan).as_vec2()
    }

    /// Model matrix taking the tile's local square to world space.
    pub fn model_matrix(&self, id: TileId) -> Mat4 {
        let half = (self.tile_size(id.z) / 2.0) as f32;
        let center = self.tile_center(id);
        Mat4::from_translation(center.extend(0.0)) * Mat4::from_scale(Vec3::new(half, half, 1.0))
    }

    /// World-space corners of a tile.
    pub fn bounds(&self, id: TileId) -> TileBounds {
        TileBounds::from_model(&self.model_matrix(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_zoom_zero_fills_map() {
        let placement = MapPlacement::default();
        let bounds = placement.bounds(TileId::new(0, 0, 0));

        assert!(approx(bounds.corners[0], Vec2::new(-500.0, -500.0)));
        assert!(approx(bounds.corners[2], Vec2::new(500.0, 500.0)));
    }

    #[test]
    fn test_row_zero_is_north() {
        let placement = MapPlacement::default();
        let north_west = placement.tile_center(TileId::new(0, 0, 1));
        assert!(approx(north_west, Vec2::new(-250.0, 250.0)));

        let south_east = placement.tile_center(TileId::new(1, 1, 1));
        assert!(approx(south_east, Vec2::new(250.0, -250.0)));
    }

    #[test]
    fn test_tile_size_halves_per_zoom() {
        let placement = MapPlacement::new(1024.0);
        assert_eq!(placement.tile_size(0), 1024.0);
        assert_eq!(placement.tile_size(3), 128.0);
    }

    #[test]
    fn test_zoom_past_u64_stays_finite() {
        let placement = MapPlacement::default();
        assert!(placement.tile_size(64) > 0.0);
        assert!(placement.model_matrix(TileId::new(0, 0, 200)).is_finite());
    }

    #[test]
    fn test_pan_moves_tiles() {
        let placement = MapPlacement::default().with_pan(Vec2::new(10.0, -5.0));
        let center = placement.tile_center(TileId::new(0, 0, 0));
        assert!(approx(center, Vec2::new(10.0, -5.0)));
    }

    #[test]
    fn test_children_tile_parent_footprint() {
        let placement = MapPlacement::default();
        let parent = placement.bounds(TileId::new(1, 0, 1));
        let children: Vec<TileBounds> = TileId::new(1, 0, 1)
            .children()
            .iter()
            .map(|c| placement.bounds(*c))
            .collect();

        let min = children.iter().flat_map(|b| b.corners).fold(Vec2::MAX, Vec2::min);
        let max = children.iter().flat_map(|b| b.corners).fold(Vec2::MIN, Vec2::max);
        assert!(approx(min, parent.corners[0]));
        assert!(approx(max, parent.corners[2]));
    }
}
