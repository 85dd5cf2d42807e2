//! Expiring on-disk tile cache.
//!
//! # File Layout
//!
//! One flat directory, one file per tile, named by the tile's canonical key:
//! ```text
//! {directory}/{z}_{x}_{y}.mvt
//! ```
//!
//! Freshness comes from the file modification time. An entry whose age
//! reaches the TTL is deleted on the read that discovers it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cache::stats::CacheStats;
use crate::cache::types::{CacheError, DiskCacheConfig, TILE_FILE_EXTENSION};
use crate::coord::TileId;

/// Result of a bulk removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearResult {
    pub files_removed: u64,
    pub bytes_freed: u64,
}

/// Space used by the cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskUsage {
    pub files: u64,
    pub bytes: u64,
}

/// Raw tile bytes on disk with a fixed time-to-live.
#[derive(Debug)]
pub struct DiskCache {
    directory: PathBuf,
    ttl: Duration,
    stats: Mutex<CacheStats>,
}

impl DiskCache {
    /// Opens the cache, creating its directory if needed.
    ///
    /// With `clear_on_start` every existing entry is removed first.
    pub async fn open(config: DiskCacheConfig) -> Result<Self, CacheError> {
        tokio::fs::create_dir_all(&config.directory).await?;

        let cache = Self {
            directory: config.directory,
            ttl: config.ttl,
            stats: Mutex::new(CacheStats::new()),
        };

        if config.clear_on_start {
            cache.clear().await?;
        }

        info!(
            dir = %cache.directory.display(),
            ttl_secs = cache.ttl.as_secs(),
            "Disk cache opened"
        );

        Ok(cache)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// File backing a tile.
    pub fn path_for(&self, id: TileId) -> PathBuf {
        self.directory
            .join(format!("{}.{}", id.key(), TILE_FILE_EXTENSION))
    }

    /// Returns the cached bytes if present and younger than the TTL.
    ///
    /// Expired entries are removed. Read errors are logged and reported as
    /// a miss.
    pub async fn get(&self, id: TileId) -> Option<Bytes> {
        let path = self.path_for(id);

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.stats.lock().record_disk_miss(false);
                return None;
            }
            Err(e) => {
                warn!(tile = %id, error = %e, "Failed to stat cached tile");
                self.stats.lock().record_disk_read_failure();
                return None;
            }
        };

        if self.is_expired(metadata.modified().ok()) {
            debug!(tile = %id, "Cached tile expired, removing");
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != ErrorKind::NotFound {
                    warn!(tile = %id, error = %e, "Failed to remove expired tile");
                }
            }
            self.stats.lock().record_disk_miss(true);
            return None;
        }

        match tokio::fs::read(&path).await {
            Ok(data) => {
                self.stats.lock().record_disk_hit();
                Some(Bytes::from(data))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.stats.lock().record_disk_miss(false);
                None
            }
            Err(e) => {
                warn!(tile = %id, error = %e, "Failed to read cached tile");
                self.stats.lock().record_disk_read_failure();
                None
            }
        }
    }

    /// Stores bytes for a tile, replacing any existing entry.
    ///
    /// The write goes to a temporary file that is renamed into place, so a
    /// concurrent reader never sees a partial tile.
    pub async fn put(&self, id: TileId, data: &[u8]) -> Result<(), CacheError> {
        let path = self.path_for(id);
        let temp_path = path.with_extension(format!("{}.tmp", TILE_FILE_EXTENSION));

        let result = async {
            tokio::fs::write(&temp_path, data).await?;
            tokio::fs::rename(&temp_path, &path).await
        }
        .await;

        match result {
            Ok(()) => {
                self.stats.lock().record_disk_write(data.len());
                debug!(tile = %id, bytes = data.len(), "Tile written to disk cache");
                Ok(())
            }
            Err(e) => {
                self.stats.lock().record_disk_write_failure();
                let _ = tokio::fs::remove_file(&temp_path).await;
                Err(CacheError::Io(e))
            }
        }
    }

    /// Deletes one entry. Returns whether a file was removed.
    pub async fn remove(&self, id: TileId) -> bool {
        tokio::fs::remove_file(self.path_for(id)).await.is_ok()
    }

    /// Removes every entry by recreating the directory.
    pub async fn clear(&self) -> Result<ClearResult, CacheError> {
        let usage = self.usage().await?;

        match tokio::fs::remove_dir_all(&self.directory).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(CacheError::Io(e)),
        }
        tokio::fs::create_dir_all(&self.directory).await?;

        info!(
            dir = %self.directory.display(),
            files = usage.files,
            bytes = usage.bytes,
            "Disk cache cleared"
        );

        Ok(ClearResult {
            files_removed: usage.files,
            bytes_freed: usage.bytes,
        })
    }

    /// Deletes every entry whose age has reached the TTL.
    pub async fn evict_expired(&self) -> Result<ClearResult, CacheError> {
        let mut result = ClearResult::default();

        for (path, modified, size) in self.scan().await? {
            if !self.is_expired(modified) {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    result.files_removed += 1;
                    result.bytes_freed += size;
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Failed to remove expired tile");
                }
            }
        }

        if result.files_removed > 0 {
            info!(
                files = result.files_removed,
                bytes = result.bytes_freed,
                "Expired tiles removed from disk cache"
            );
        }
        Ok(result)
    }

    /// Counts tile files and their total size.
    pub async fn usage(&self) -> Result<DiskUsage, CacheError> {
        let files = self.scan().await?;
        Ok(DiskUsage {
            files: files.len() as u64,
            bytes: files.iter().map(|(_, _, size)| size).sum(),
        })
    }

    /// Snapshot of the disk counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    fn is_expired(&self, modified: Option<SystemTime>) -> bool {
        let age = modified
            .and_then(|m| SystemTime::now().duration_since(m).ok())
            .unwrap_or(Duration::ZERO);
        age >= self.ttl
    }

    /// Tile files with their modification time and size.
    async fn scan(&self) -> Result<Vec<(PathBuf, Option<SystemTime>, u64)>, CacheError> {
        let mut files = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(CacheError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TILE_FILE_EXTENSION) {
                continue;
            }
            if let Ok(metadata) = entry.metadata().await {
                if metadata.is_file() {
                    files.push((path, metadata.modified().ok(), metadata.len()));
                }
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_cache(ttl: Duration) -> (TempDir, DiskCache) {
        let temp_dir = TempDir::new().unwrap();
        let config = DiskCacheConfig::new(temp_dir.path()).with_ttl(ttl);
        let cache = DiskCache::open(config).await.unwrap();
        (temp_dir, cache)
    }

    fn backdate(path: &Path, age: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[tokio::test]
    async fn test_put_then_get_returns_same_bytes() {
        let (_temp_dir, cache) = create_test_cache(DEFAULT_TTL).await;
        let tile = TileId::new(3, 5, 4);

        cache.put(tile, &[1, 2, 3, 4]).await.unwrap();
        let data = cache.get(tile).await;

        assert_eq!(data.as_deref(), Some(&[1u8, 2, 3, 4][..]));
        assert!(cache.path_for(tile).ends_with("4_3_5.mvt"));
    }

    #[tokio::test]
    async fn test_missing_tile_is_miss() {
        let (_temp_dir, cache) = create_test_cache(DEFAULT_TTL).await;

        assert!(cache.get(TileId::new(0, 0, 0)).await.is_none());
        assert_eq!(cache.stats().disk_misses, 1);
        assert_eq!(cache.stats().disk_hits, 0);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let (_temp_dir, cache) = create_test_cache(DEFAULT_TTL).await;
        let tile = TileId::new(1, 1, 1);

        cache.put(tile, &[1, 2, 3]).await.unwrap();
        cache.put(tile, &[9]).await.unwrap();

        assert_eq!(cache.get(tile).await.as_deref(), Some(&[9u8][..]));
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed() {
        let (_temp_dir, cache) = create_test_cache(DEFAULT_TTL).await;
        let tile = TileId::new(2, 2, 2);

        cache.put(tile, &[7; 16]).await.unwrap();
        backdate(&cache.path_for(tile), DEFAULT_TTL + Duration::from_secs(3600));

        assert!(cache.get(tile).await.is_none());
        assert!(!cache.path_for(tile).exists());
        assert_eq!(cache.stats().disk_expired, 1);
    }

    #[tokio::test]
    async fn test_entry_inside_ttl_survives() {
        let (_temp_dir, cache) = create_test_cache(DEFAULT_TTL).await;
        let tile = TileId::new(2, 2, 2);

        cache.put(tile, &[7; 16]).await.unwrap();
        backdate(&cache.path_for(tile), Duration::from_secs(6 * 24 * 3600));

        assert!(cache.get(tile).await.is_some());
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let (_temp_dir, cache) = create_test_cache(Duration::ZERO).await;
        let tile = TileId::new(0, 0, 0);

        cache.put(tile, &[1]).await.unwrap();
        assert!(cache.get(tile).await.is_none());
        assert!(!cache.path_for(tile).exists());
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (_temp_dir, cache) = create_test_cache(DEFAULT_TTL).await;

        cache.put(TileId::new(0, 0, 1), &[0; 10]).await.unwrap();
        cache.put(TileId::new(1, 0, 1), &[0; 20]).await.unwrap();

        let result = cache.clear().await.unwrap();
        assert_eq!(result.files_removed, 2);
        assert_eq!(result.bytes_freed, 30);

        assert!(cache.directory().exists());
        assert_eq!(cache.usage().await.unwrap(), DiskUsage::default());
        assert!(cache.get(TileId::new(0, 0, 1)).await.is_none());
    }

    #[tokio::test]
    async fn test_clear_on_start() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("1_0_0.mvt"), [1, 2, 3]).unwrap();

        let config = DiskCacheConfig::new(temp_dir.path()).with_clear_on_start(true);
        let cache = DiskCache::open(config).await.unwrap();

        assert_eq!(cache.usage().await.unwrap().files, 0);
    }

    #[tokio::test]
    async fn test_evict_expired_keeps_fresh_entries() {
        let (_temp_dir, cache) = create_test_cache(DEFAULT_TTL).await;
        let old = TileId::new(0, 0, 1);
        let fresh = TileId::new(1, 0, 1);

        cache.put(old, &[0; 8]).await.unwrap();
        cache.put(fresh, &[0; 4]).await.unwrap();
        backdate(&cache.path_for(old), DEFAULT_TTL * 2);

        let result = cache.evict_expired().await.unwrap();
        assert_eq!(result.files_removed, 1);
        assert_eq!(result.bytes_freed, 8);
        assert!(cache.path_for(fresh).exists());
    }

    #[tokio::test]
    async fn test_usage_ignores_foreign_files() {
        let (temp_dir, cache) = create_test_cache(DEFAULT_TTL).await;
        std::fs::write(temp_dir.path().join("notes.txt"), b"hello").unwrap();
        cache.put(TileId::new(0, 0, 0), &[0; 5]).await.unwrap();

        let usage = cache.usage().await.unwrap();
        assert_eq!(usage.files, 1);
        assert_eq!(usage.bytes, 5);
    }

    const DEFAULT_TTL: Duration = crate::cache::DEFAULT_DISK_TTL;
}
