//! Two-tier tile cache.
//!
//! - [`DiskCache`] keeps raw fetched bytes on disk with a fixed time-to-live.
//! - [`DecodedTileCache`] keeps decoded, uploaded tiles in memory under a
//!   byte-cost budget with LRU eviction.
//!
//! Both tiers record [`CacheStats`]; disk I/O failures degrade to misses and
//! never surface as fatal errors.

mod disk;
mod memory;
mod stats;
mod types;

pub use disk::{ClearResult, DiskCache, DiskUsage};
pub use memory::DecodedTileCache;
pub use stats::CacheStats;
pub use types::{
    default_tile_directory, CacheError, DiskCacheConfig, MemoryCacheConfig, DEFAULT_DISK_TTL,
    DEFAULT_MEMORY_BUDGET, TILE_FILE_EXTENSION,
};
