//! View-frustum culling for map tiles.
//!
//! A [`Frustum`] is derived once per frame from the camera's combined
//! projection × view matrix and then shared read-only by every tile test
//! that frame. Tiles are flat quads on the `z = 0` plane ([`TileBounds`]).
//!
//! The test is conservative: a quad is rejected only when all four corners
//! lie behind a single plane. Quads that are outside but straddle several
//! planes are reported visible, which costs some overdraw and never hides a
//! visible tile.

mod frame;

pub use frame::{FrameTile, FrameTileCache};

use glam::{Mat4, Vec2, Vec4};

/// Normals shorter than this are left unnormalized.
const MIN_NORMAL_LENGTH: f32 = 1e-8;

/// Index of each plane in [`Frustum::planes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    Left = 0,
    Right = 1,
    Bottom = 2,
    Top = 3,
    Near = 4,
    Far = 5,
}

/// Six clip planes as `(a, b, c, d)` with `a·x + b·y + c·z + d ≥ 0` inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    /// Builds the frustum for `projection * view`.
    pub fn new(projection: Mat4, view: Mat4) -> Self {
        Self::from_matrix(projection * view)
    }

    /// Extracts planes from a combined clip transform.
    ///
    /// Clip-space depth is expected in `[0, 1]` (the `glam::Mat4::perspective_*`
    /// convention), so the near plane is row 2 on its own.
    pub fn from_matrix(m: Mat4) -> Self {
        let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));

        let planes = [
            r3 + r0, // left
            r3 - r0, // right
            r3 + r1, // bottom
            r3 - r1, // top
            r2,      // near
            r3 - r2, // far
        ]
        .map(normalize_plane);

        Self { planes }
    }

    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    pub fn plane(&self, plane: Plane) -> Vec4 {
        self.planes[plane as usize]
    }

    /// True unless some plane has all four corners strictly behind it.
    pub fn contains(&self, bounds: &TileBounds) -> bool {
        let points = bounds.corners.map(|c| Vec4::new(c.x, c.y, 0.0, 1.0));

        for plane in &self.planes {
            if points.iter().all(|p| plane.dot(*p) < 0.0) {
                return false;
            }
        }
        true
    }
}

fn normalize_plane(plane: Vec4) -> Vec4 {
    let length = plane.truncate().length();
    if length > MIN_NORMAL_LENGTH {
        plane / length
    } else {
        plane
    }
}

/// World-space corners of a tile quad on the `z = 0` plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    /// Left-bottom, right-bottom, right-top, left-top.
    pub corners: [Vec2; 4],
}

impl TileBounds {
    pub fn new(corners: [Vec2; 4]) -> Self {
        Self { corners }
    }

    /// Axis-aligned rectangle between two corners.
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self::new([
            min,
            Vec2::new(max.x, min.y),
            max,
            Vec2::new(min.x, max.y),
        ])
    }

    /// Corners of the local `[-1, 1]²` square under a model matrix.
    pub fn from_model(model: &Mat4) -> Self {
        let corner = |x: f32, y: f32| {
            let p = *model * Vec4::new(x, y, 0.0, 1.0);
            Vec2::new(p.x, p.y)
        };
        Self::new([
            corner(-1.0, -1.0),
            corner(1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, 1.0),
        ])
    }
}
