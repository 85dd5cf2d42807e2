//! tilestream - Tile resolution and caching for streaming vector maps
//!
//! This library decides which map tiles a renderer draws each frame, keeps
//! decoded tiles resident within a memory budget, and streams missing tiles
//! from disk or the network without ever blocking the render path.
//!
//! # High-Level API
//!
//! For most use cases, the [`engine`] module provides a single facade:
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilestream::config::ConfigFile;
//! use tilestream::engine::TileEngineBuilder;
//!
//! let engine = TileEngineBuilder::new(ConfigFile::load()?, Arc::new(decoder))
//!     .build()
//!     .await?;
//!
//! let visible = engine.visible_tiles(center_x, center_y, zoom);
//! let resolved = engine.resolve(&visible, false);
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod culling;
pub mod decode;
pub mod engine;
pub mod gpu;
pub mod logging;
pub mod pipeline;
pub mod provider;
pub mod resolver;
pub mod tile;
pub mod visible;

/// Version of the tilestream library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version_is_set() {
        assert!(!super::VERSION.is_empty());
    }

    #[test]
    fn test_coord_module_exists() {
        use crate::coord::TileId;
        let tile = TileId::from_lat_lon(40.7128, -74.0060, 16);
        assert!(tile.is_ok());
    }
}
