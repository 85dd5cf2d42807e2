//! Aggregated engine statistics.

use crate::cache::CacheStats;
use crate::pipeline::{AdmissionStats, DebounceStats, UploadStats};
use std::fmt;

/// One snapshot of every component's counters.
#[derive(Debug, Clone)]
pub struct EngineStats {
    /// Disk and decoded cache counters, combined
    pub cache: CacheStats,
    pub admission: AdmissionStats,
    pub debounce: DebounceStats,
    pub upload: UploadStats,
    /// Fetches in flight at snapshot time
    pub pending: usize,
    /// Tiles waiting for a fetch slot at snapshot time
    pub queued: usize,
    /// Fetched tiles not yet decoded at snapshot time
    pub awaiting_decode: usize,
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "decoded cache: {} tiles, {} / {} bytes, {:.1}% hit rate, {} evictions",
            self.cache.memory_entry_count,
            self.cache.memory_cost_bytes,
            self.cache.memory_budget_bytes,
            self.cache.memory_hit_rate() * 100.0,
            self.cache.memory_evictions,
        )?;
        writeln!(
            f,
            "disk cache: {} hits, {} misses ({} expired), {} writes",
            self.cache.disk_hits,
            self.cache.disk_misses,
            self.cache.disk_expired,
            self.cache.disk_writes,
        )?;
        writeln!(
            f,
            "fetch: {} pending, {} queued, {} started, {} deduplicated, {} dropped, {} failed",
            self.pending,
            self.queued,
            self.admission.started,
            self.admission.deduplicated,
            self.admission.dropped,
            self.admission.failures,
        )?;
        write!(
            f,
            "upload: {} waiting, {} batches, {} tiles, {} decode failures, {} discarded by batch cap",
            self.awaiting_decode,
            self.upload.batches,
            self.upload.uploaded,
            self.upload.decode_failures,
            self.debounce.discarded,
        )
    }
}
