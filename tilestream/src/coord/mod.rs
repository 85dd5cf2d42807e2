//! Tile identity and coordinate conversion
//!
//! [`TileId`] is the universal request and cache key. This module also
//! converts between geographic coordinates and Web Mercator tile ids.

mod types;

pub use types::{
    Ancestors, CoordError, TileId, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

impl TileId {
    /// Tile containing a geographic position.
    ///
    /// # Arguments
    ///
    /// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
    /// * `lon` - Longitude in degrees (-180.0 to 180.0)
    /// * `zoom` - Zoom level (0 to [`MAX_ZOOM`])
    pub fn from_lat_lon(lat: f64, lon: f64, zoom: u8) -> Result<TileId, CoordError> {
        let (x, y) = fractional_tile(lat, lon, zoom)?;
        let last = TileId::tiles_per_side(zoom) - 1;

        // lon = 180 and lat = MIN_LAT land exactly on the far edge
        Ok(TileId::new(
            (x as u64).min(last) as u32,
            (y as u64).min(last) as u32,
            zoom,
        ))
    }

    /// Latitude and longitude of the tile's northwest corner.
    pub fn northwest_corner(&self) -> (f64, f64) {
        let n = TileId::tiles_per_side(self.z) as f64;

        let lon = self.x as f64 / n * 360.0 - 180.0;

        let y = self.y as f64 / n;
        let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();

        (lat, lon)
    }
}

/// Fractional tile coordinates of a geographic position at `zoom`.
///
/// The integer part is the tile column and row; the fraction is the
/// position inside that tile.
pub fn fractional_tile(lat: f64, lon: f64, zoom: u8) -> Result<(f64, f64), CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = TileId::tiles_per_side(zoom) as f64;
    let x = (lon + 180.0) / 360.0 * n;
    let y = (1.0 - lat.to_radians().tan().asinh() / PI) / 2.0 * n;
    Ok((x, y))
}
