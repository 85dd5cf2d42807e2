//! Cache configuration and error types.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default disk entry lifetime: one week.
pub const DEFAULT_DISK_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default decoded-tile budget: 256 MB.
pub const DEFAULT_MEMORY_BUDGET: u64 = 256 * 1024 * 1024;

/// Extension of cached tile files.
pub const TILE_FILE_EXTENSION: &str = "mvt";

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid cache configuration
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

/// Decoded tile cache configuration.
#[derive(Debug, Clone)]
pub struct MemoryCacheConfig {
    /// Byte budget for all resident tiles (default: 256 MB)
    pub max_cost_bytes: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_cost_bytes: DEFAULT_MEMORY_BUDGET,
        }
    }
}

impl MemoryCacheConfig {
    pub fn new(max_cost_bytes: u64) -> Self {
        Self { max_cost_bytes }
    }
}

/// Disk cache configuration.
#[derive(Debug, Clone)]
pub struct DiskCacheConfig {
    /// Directory holding one file per tile
    pub directory: PathBuf,
    /// Entries older than this are treated as absent (default: 7 days)
    pub ttl: Duration,
    /// Purge every entry when the cache is opened
    pub clear_on_start: bool,
}

impl Default for DiskCacheConfig {
    fn default() -> Self {
        Self {
            directory: default_tile_directory(),
            ttl: DEFAULT_DISK_TTL,
            clear_on_start: false,
        }
    }
}

impl DiskCacheConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clear_on_start(mut self, clear: bool) -> Self {
        self.clear_on_start = clear;
        self
    }
}

/// `<user cache dir>/tilestream/MapTiles`.
pub fn default_tile_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilestream")
        .join("MapTiles")
}
