//! Decoded tile cache with a byte-cost budget.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::stats::CacheStats;
use crate::cache::types::MemoryCacheConfig;
use crate::coord::TileId;
use crate::tile::DecodedTile;

#[derive(Clone)]
struct CachedTile {
    tile: Arc<DecodedTile>,
    cost: u32,
}

/// In-memory cache of ready-to-draw tiles.
///
/// Each entry is weighed by its cost in bytes; once the total exceeds the
/// budget the least recently used tiles are evicted. Pending evictions are
/// applied before [`put`](Self::put) returns, so the budget holds after every
/// insert. A tile heavier than the whole budget is never admitted.
pub struct DecodedTileCache {
    cache: Cache<TileId, CachedTile>,
    budget: u64,
    evictions: Arc<AtomicU64>,
    stats: Mutex<CacheStats>,
}

impl DecodedTileCache {
    pub fn new(config: MemoryCacheConfig) -> Self {
        let evictions = Arc::new(AtomicU64::new(0));
        let listener_evictions = Arc::clone(&evictions);

        let cache = Cache::builder()
            .max_capacity(config.max_cost_bytes)
            .weigher(|_id: &TileId, entry: &CachedTile| entry.cost)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |id: Arc<TileId>, _entry, cause: RemovalCause| {
                if cause.was_evicted() {
                    listener_evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(tile = %id, "Decoded tile evicted");
                }
            })
            .build();

        Self {
            cache,
            budget: config.max_cost_bytes,
            evictions,
            stats: Mutex::new(CacheStats::new()),
        }
    }

    /// Inserts a tile charged at `cost_bytes`, replacing any previous entry.
    pub fn put(&self, id: TileId, tile: Arc<DecodedTile>, cost_bytes: usize) {
        let cost = u32::try_from(cost_bytes).unwrap_or(u32::MAX);
        self.cache.insert(id, CachedTile { tile, cost });
        self.cache.run_pending_tasks();
        self.stats.lock().record_memory_insert();
    }

    /// Inserts a tile charged at its own buffer cost.
    pub fn insert(&self, tile: DecodedTile) -> Arc<DecodedTile> {
        let id = tile.id;
        let cost = tile.cost_bytes();
        let tile = Arc::new(tile);
        self.put(id, Arc::clone(&tile), cost);
        tile
    }

    pub fn get(&self, id: &TileId) -> Option<Arc<DecodedTile>> {
        let found = self.cache.get(id).map(|entry| entry.tile);
        let mut stats = self.stats.lock();
        if found.is_some() {
            stats.record_memory_hit();
        } else {
            stats.record_memory_miss();
        }
        found
    }

    /// Presence check without touching recency or statistics.
    pub fn contains(&self, id: &TileId) -> bool {
        self.cache.contains_key(id)
    }

    pub fn remove(&self, id: &TileId) {
        self.cache.invalidate(id);
        self.cache.run_pending_tasks();
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    /// Byte budget.
    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Total cost of resident tiles.
    pub fn resident_cost(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.weighted_size()
    }

    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the memory counters.
    pub fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks();
        let mut stats = self.stats.lock().clone();
        stats.memory_evictions = self.evictions.load(Ordering::Relaxed);
        stats.memory_cost_bytes = self.cache.weighted_size();
        stats.memory_entry_count = self.cache.entry_count();
        stats.memory_budget_bytes = self.budget;
        stats
    }
}
