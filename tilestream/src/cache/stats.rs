//! Cache statistics tracking and reporting.

use std::time::Instant;

/// Counters for both cache tiers.
///
/// Each tier fills in its own fields; [`CacheStats::combine`] merges a disk
/// snapshot with a memory snapshot for reporting.
#[derive(Debug, Clone)]
pub struct CacheStats {
    // Decoded tile cache
    pub memory_hits: u64,
    pub memory_misses: u64,
    pub memory_inserts: u64,
    pub memory_evictions: u64,
    pub memory_cost_bytes: u64,
    pub memory_entry_count: u64,
    pub memory_budget_bytes: u64,

    // Disk cache
    pub disk_hits: u64,
    pub disk_misses: u64,
    pub disk_expired: u64,
    pub disk_read_failures: u64,
    pub disk_writes: u64,
    pub disk_write_failures: u64,
    pub disk_bytes_written: u64,

    pub created_at: Instant,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStats {
    pub fn new() -> Self {
        Self {
            memory_hits: 0,
            memory_misses: 0,
            memory_inserts: 0,
            memory_evictions: 0,
            memory_cost_bytes: 0,
            memory_entry_count: 0,
            memory_budget_bytes: 0,
            disk_hits: 0,
            disk_misses: 0,
            disk_expired: 0,
            disk_read_failures: 0,
            disk_writes: 0,
            disk_write_failures: 0,
            disk_bytes_written: 0,
            created_at: Instant::now(),
        }
    }

    /// Calculate memory cache hit rate (0.0 to 1.0).
    pub fn memory_hit_rate(&self) -> f64 {
        rate(self.memory_hits, self.memory_misses)
    }

    /// Calculate disk cache hit rate (0.0 to 1.0).
    pub fn disk_hit_rate(&self) -> f64 {
        rate(self.disk_hits, self.disk_misses)
    }

    /// Fraction of the memory budget in use (0.0 to 1.0).
    pub fn memory_utilization(&self) -> f64 {
        if self.memory_budget_bytes == 0 {
            0.0
        } else {
            self.memory_cost_bytes as f64 / self.memory_budget_bytes as f64
        }
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    pub fn record_memory_hit(&mut self) {
        self.memory_hits += 1;
    }

    pub fn record_memory_miss(&mut self) {
        self.memory_misses += 1;
    }

    pub fn record_memory_insert(&mut self) {
        self.memory_inserts += 1;
    }

    pub fn record_disk_hit(&mut self) {
        self.disk_hits += 1;
    }

    /// Expired entries also count as misses.
    pub fn record_disk_miss(&mut self, expired: bool) {
        self.disk_misses += 1;
        if expired {
            self.disk_expired += 1;
        }
    }

    pub fn record_disk_read_failure(&mut self) {
        self.disk_read_failures += 1;
        self.disk_misses += 1;
    }

    pub fn record_disk_write(&mut self, bytes: usize) {
        self.disk_writes += 1;
        self.disk_bytes_written += bytes as u64;
    }

    pub fn record_disk_write_failure(&mut self) {
        self.disk_write_failures += 1;
    }

    /// Disk fields from `disk`, memory fields from `memory`.
    pub fn combine(disk: &CacheStats, memory: &CacheStats) -> CacheStats {
        CacheStats {
            memory_hits: memory.memory_hits,
            memory_misses: memory.memory_misses,
            memory_inserts: memory.memory_inserts,
            memory_evictions: memory.memory_evictions,
            memory_cost_bytes: memory.memory_cost_bytes,
            memory_entry_count: memory.memory_entry_count,
            memory_budget_bytes: memory.memory_budget_bytes,
            disk_hits: disk.disk_hits,
            disk_misses: disk.disk_misses,
            disk_expired: disk.disk_expired,
            disk_read_failures: disk.disk_read_failures,
            disk_writes: disk.disk_writes,
            disk_write_failures: disk.disk_write_failures,
            disk_bytes_written: disk.disk_bytes_written,
            created_at: disk.created_at.min(memory.created_at),
        }
    }
}

fn rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
