//! Tile identity types

use std::fmt;
use std::str::FromStr;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Supported zoom range of the tile pyramid.
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// Address of one tile in the slippy-map pyramid.
///
/// Level `z` holds `2^z × 2^z` tiles; `x` grows eastward from the
/// antimeridian and `y` grows southward from the north edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    /// Column (west to east)
    pub x: u32,
    /// Row (north to south)
    pub y: u32,
    /// Zoom level
    pub z: u8,
}

impl TileId {
    /// Creates a tile id without range checks.
    #[inline]
    pub const fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Creates a tile id, rejecting coordinates outside the pyramid.
    pub fn checked(x: u32, y: u32, z: u8) -> Result<Self, CoordError> {
        if z > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(z));
        }
        let tile = Self { x, y, z };
        if !tile.is_valid() {
            return Err(CoordError::OutOfRange { x, y, z });
        }
        Ok(tile)
    }

    /// Number of tiles along one side of level `z`.
    ///
    /// Saturates at `u64::MAX` for levels past what a `u64` can count.
    #[inline]
    pub const fn tiles_per_side(z: u8) -> u64 {
        match 1u64.checked_shl(z as u32) {
            Some(side) => side,
            None => u64::MAX,
        }
    }

    /// True when `x` and `y` both lie in `[0, 2^z)`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        let side = Self::tiles_per_side(self.z);
        (self.x as u64) < side && (self.y as u64) < side
    }

    /// Canonical `"z_x_y"` key used by external stores.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Tile one level up, or `None` at zoom 0.
    #[inline]
    pub fn parent(&self) -> Option<TileId> {
        if self.z == 0 {
            return None;
        }
        Some(TileId::new(self.x >> 1, self.y >> 1, self.z - 1))
    }

    /// Iterates ancestors from `z - 1` down to zoom 0.
    #[inline]
    pub fn ancestors(&self) -> Ancestors {
        Ancestors { current: *self }
    }

    /// Ancestor at zoom `z`. Returns the tile itself when `z` equals its zoom
    /// and `None` when `z` is deeper.
    pub fn ancestor_at(&self, z: u8) -> Option<TileId> {
        if z > self.z {
            return None;
        }
        let shift = (self.z - z) as u32;
        Some(TileId::new(
            self.x.checked_shr(shift).unwrap_or(0),
            self.y.checked_shr(shift).unwrap_or(0),
            z,
        ))
    }

    /// True if `other` lies inside this tile's footprint.
    ///
    /// A tile covers itself and every descendant whose coordinates, shifted
    /// right by the zoom difference, land on this tile.
    #[inline]
    pub fn covers(&self, other: &TileId) -> bool {
        if other.z < self.z {
            return false;
        }
        let shift = (other.z - self.z) as u32;
        other.x.checked_shr(shift).unwrap_or(0) == self.x
            && other.y.checked_shr(shift).unwrap_or(0) == self.y
    }

    /// The four tiles one level down, in NW, NE, SW, SE order.
    pub fn children(&self) -> [TileId; 4] {
        let (x, y, z) = (self.x << 1, self.y << 1, self.z + 1);
        [
            TileId::new(x, y, z),
            TileId::new(x + 1, y, z),
            TileId::new(x, y + 1, z),
            TileId::new(x + 1, y + 1, z),
        ]
    }

    /// Wraps a possibly negative or overflowing column around the antimeridian.
    #[inline]
    pub fn wrap_x(x: i64, z: u8) -> u32 {
        x.rem_euclid(Self::tiles_per_side(z) as i64) as u32
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.z, self.x, self.y)
    }
}

impl FromStr for TileId {
    type Err = CoordError;

    /// Parses the canonical `"z_x_y"` key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoordError::InvalidKey(s.to_string());
        let mut parts = s.split('_');
        let z = parts.next().ok_or_else(invalid)?;
        let x = parts.next().ok_or_else(invalid)?;
        let y = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let z: u8 = z.parse().map_err(|_| invalid())?;
        let x: u32 = x.parse().map_err(|_| invalid())?;
        let y: u32 = y.parse().map_err(|_| invalid())?;
        TileId::checked(x, y, z)
    }
}

/// Iterator over a tile's ancestors, nearest first.
#[derive(Debug, Clone)]
pub struct Ancestors {
    current: TileId,
}

impl Iterator for Ancestors {
    type Item = TileId;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let parent = self.current.parent()?;
        self.current = parent;
        Some(parent)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.current.z as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Ancestors {}

/// Errors that can occur when building or parsing tile ids.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is outside valid range (-85.05112878 to 85.05112878)
    InvalidLatitude(f64),
    /// Longitude is outside valid range (-180.0 to 180.0)
    InvalidLongitude(f64),
    /// Zoom level is outside valid range
    InvalidZoom(u8),
    /// Column or row lies outside `[0, 2^z)`
    OutOfRange { x: u32, y: u32, z: u8 },
    /// Key is not of the form `z_x_y`
    InvalidKey(String),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "Invalid latitude: {} (must be between {} and {})",
                    lat, MIN_LAT, MAX_LAT
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between {} and {})",
                    lon, MIN_LON, MAX_LON
                )
            }
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between {} and {})",
                    zoom, MIN_ZOOM, MAX_ZOOM
                )
            }
            CoordError::OutOfRange { x, y, z } => {
                write!(
                    f,
                    "Tile {}/{} is outside zoom level {} (coordinates must be below {})",
                    x,
                    y,
                    z,
                    TileId::tiles_per_side(*z)
                )
            }
            CoordError::InvalidKey(key) => {
                write!(f, "Invalid tile key: '{}' (expected z_x_y)", key)
            }
        }
    }
}

impl std::error::Error for CoordError {}
