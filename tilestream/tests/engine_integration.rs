//! Integration tests for the tile engine.
//!
//! These tests drive the complete path a renderer exercises each frame:
//! - Resolving visible tiles and requesting the missing ones
//! - Fetching through the disk cache
//! - Debounced batch decode and upload into the decoded cache
//! - Ancestor fallback while finer tiles load
//! - A render loop that resolves faster than the debounce interval
//! - Disk cache reuse across engine restarts

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tempfile::TempDir;
use tilestream::config::ConfigFile;
use tilestream::coord::TileId;
use tilestream::decode::{DecodeError, MapStyle, ParsedTile, PolygonVertex, StyleUniform, TileDecoder};
use tilestream::engine::{TileEngine, TileEngineBuilder};
use tilestream::pipeline::RequestOutcome;
use tilestream::provider::{ProviderError, TileFetcher};
use tokio::sync::mpsc;
use tokio::time::timeout;

// =============================================================================
// Test Helpers
// =============================================================================

/// Serves the tile key as its body and counts every call.
///
/// Clones share state, so a test keeps one handle while the engine owns another.
#[derive(Clone, Default)]
struct MemoryFetcher {
    state: Arc<FetcherState>,
}

#[derive(Default)]
struct FetcherState {
    calls: AtomicUsize,
    fetched: Mutex<Vec<TileId>>,
    failing: Mutex<HashSet<TileId>>,
}

impl MemoryFetcher {
    fn fail(&self, id: TileId) {
        self.state.failing.lock().insert(id);
    }

    fn recover(&self, id: TileId) {
        self.state.failing.lock().remove(&id);
    }

    fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    fn fetched(&self) -> Vec<TileId> {
        self.state.fetched.lock().clone()
    }
}

impl TileFetcher for MemoryFetcher {
    async fn fetch(&self, id: TileId) -> Result<Bytes, ProviderError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        if self.state.failing.lock().contains(&id) {
            return Err(ProviderError::UnexpectedStatus {
                status: 503,
                url: id.key(),
            });
        }
        self.state.fetched.lock().push(id);
        Ok(Bytes::from(id.key()))
    }

    fn name(&self) -> &str {
        "memory"
    }

    fn max_zoom(&self) -> u8 {
        22
    }
}

/// One triangle per tile; bodies starting with `!` are malformed.
fn triangle_decoder() -> Arc<dyn TileDecoder> {
    Arc::new(|_id: TileId, bytes: &[u8], _style: &dyn MapStyle| {
        if bytes.first() == Some(&b'!') {
            return Err(DecodeError::Malformed("bad tile".to_string()));
        }
        let vertex = |x, y| PolygonVertex {
            position: [x, y],
            style_index: 0,
        };
        Ok(ParsedTile {
            vertices: vec![vertex(-1.0, -1.0), vertex(1.0, -1.0), vertex(0.0, 1.0)],
            indices: vec![0, 1, 2],
            styles: vec![StyleUniform {
                color: [0.2, 0.4, 0.8, 1.0],
            }],
            labels: Vec::new(),
        })
    })
}

fn test_config(cache_dir: &Path) -> ConfigFile {
    let mut config = ConfigFile::default();
    config.provider.provider_type = "template".to_string();
    config.provider.url_template = Some("http://tiles.invalid/{z}/{x}/{y}.mvt".to_string());
    config.cache.directory = cache_dir.to_path_buf();
    config.decode.debounce = Duration::from_millis(20);
    config
}

struct Harness {
    engine: TileEngine<MemoryFetcher>,
    fetcher: MemoryFetcher,
    changed: mpsc::UnboundedReceiver<()>,
}

async fn start(config: ConfigFile, fetcher: MemoryFetcher) -> Harness {
    let (tx, changed) = mpsc::unbounded_channel();
    let engine = TileEngineBuilder::new(config, triangle_decoder())
        .on_tiles_changed(Arc::new(move || {
            let _ = tx.send(());
        }))
        .build_with_fetcher(fetcher.clone())
        .await
        .expect("engine should start");
    Harness {
        engine,
        fetcher,
        changed,
    }
}

/// Polls `condition` until it holds or two seconds pass.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met within timeout");
}

// =============================================================================
// Load path
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_tile_loads_and_resolves() {
    let dir = TempDir::new().unwrap();
    let mut h = start(test_config(dir.path()), MemoryFetcher::default()).await;
    let tile = TileId::new(4, 6, 4);

    let first = h.engine.resolve(&[tile], false);
    assert!(first.is_empty());

    timeout(Duration::from_secs(2), h.changed.recv())
        .await
        .expect("tiles-changed callback should fire")
        .unwrap();

    let second = h.engine.resolve(&[tile], false);
    assert_eq!(second.actual.len(), 1);
    assert_eq!(second.actual[0].id, tile);
    assert!(second.fallback.is_empty());

    assert_eq!(h.fetcher.calls(), 1);
    assert!(h.engine.disk_cache().path_for(tile).exists());

    let stats = h.engine.stats();
    assert_eq!(stats.admission.network_fetches, 1);
    assert_eq!(stats.upload.uploaded, 1);
    assert_eq!(stats.cache.memory_entry_count, 1);
    h.engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_repeated_resolve_fetches_once() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.decode.debounce = Duration::from_millis(200);
    let h = start(config, MemoryFetcher::default()).await;
    let tile = TileId::new(1, 1, 2);

    for _ in 0..10 {
        h.engine.resolve(&[tile], false);
    }
    wait_until(|| h.engine.stats().debounce.received == 1).await;
    for _ in 0..10 {
        h.engine.resolve(&[tile], false);
    }
    h.engine.flush().await;

    assert_eq!(h.fetcher.calls(), 1);
    assert!(h.engine.decoded_cache().contains(&tile));
    h.engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cache_only_resolve_never_requests() {
    let dir = TempDir::new().unwrap();
    let h = start(test_config(dir.path()), MemoryFetcher::default()).await;

    let resolved = h.engine.resolve(&[TileId::new(0, 0, 3)], true);
    assert!(resolved.is_empty());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.fetcher.calls(), 0);
    assert_eq!(h.engine.stats().admission.requested, 0);
    h.engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_flush_decodes_without_waiting_for_quiet_period() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.decode.debounce = Duration::from_secs(30);
    let h = start(config, MemoryFetcher::default()).await;
    let tile = TileId::new(3, 3, 3);

    h.engine.resolve(&[tile], false);
    wait_until(|| h.engine.stats().debounce.received == 1).await;
    assert!(!h.engine.decoded_cache().contains(&tile));

    assert_eq!(h.engine.flush().await, 1);
    assert!(h.engine.decoded_cache().contains(&tile));
    h.engine.shutdown().await;
}

// =============================================================================
// Ancestor fallback
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_children_fall_back_to_loaded_parent() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.decode.debounce = Duration::from_secs(30);
    let h = start(config, MemoryFetcher::default()).await;

    let parent = TileId::new(2, 1, 2);
    h.engine.resolve(&[parent], false);
    wait_until(|| h.engine.stats().debounce.received == 1).await;
    h.engine.flush().await;

    let children = parent.children();
    let resolved = h.engine.resolve(&children, false);
    assert!(resolved.actual.is_empty());
    assert_eq!(resolved.fallback.len(), 1);
    assert_eq!(resolved.fallback[0].id, parent);

    wait_until(|| h.engine.stats().debounce.received == 5).await;
    h.engine.flush().await;

    let resolved = h.engine.resolve(&children, false);
    assert_eq!(resolved.actual.len(), 4);
    assert!(resolved.fallback.is_empty());
    assert_eq!(h.fetcher.calls(), 5);
    h.engine.shutdown().await;
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_tile_is_retried_on_next_pass() {
    let dir = TempDir::new().unwrap();
    let h = start(test_config(dir.path()), MemoryFetcher::default()).await;
    let tile = TileId::new(5, 5, 5);
    h.fetcher.fail(tile);

    h.engine.resolve(&[tile], false);
    wait_until(|| h.engine.stats().admission.failures == 1).await;
    assert!(!h.engine.disk_cache().path_for(tile).exists());

    h.fetcher.recover(tile);
    h.engine.resolve(&[tile], false);
    wait_until(|| h.engine.decoded_cache().contains(&tile)).await;
    assert_eq!(h.fetcher.calls(), 2);
    h.engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_tile_does_not_block_batch() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.decode.debounce = Duration::from_secs(30);
    let h = start(config, MemoryFetcher::default()).await;

    let bad = TileId::new(0, 0, 1);
    let good = TileId::new(1, 0, 1);
    h.engine.disk_cache().put(bad, b"!garbage").await.unwrap();

    h.engine.resolve(&[bad, good], false);
    wait_until(|| h.engine.stats().debounce.received == 2).await;
    h.engine.flush().await;

    assert!(!h.engine.decoded_cache().contains(&bad));
    assert!(h.engine.decoded_cache().contains(&good));
    let stats = h.engine.stats();
    assert_eq!(stats.upload.decode_failures, 1);
    assert_eq!(stats.admission.disk_hits, 1);
    h.engine.shutdown().await;
}

// =============================================================================
// Disk cache lifecycle
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_restart_serves_tiles_from_disk() {
    let dir = TempDir::new().unwrap();
    let tile = TileId::new(7, 9, 5);

    let first = start(test_config(dir.path()), MemoryFetcher::default()).await;
    first.engine.resolve(&[tile], false);
    wait_until(|| first.engine.decoded_cache().contains(&tile)).await;
    first.engine.shutdown().await;

    let second = start(test_config(dir.path()), MemoryFetcher::default()).await;
    second.engine.resolve(&[tile], false);
    wait_until(|| second.engine.decoded_cache().contains(&tile)).await;

    assert_eq!(second.fetcher.calls(), 0);
    assert_eq!(second.engine.stats().admission.disk_hits, 1);
    second.engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_clear_on_start_discards_downloads() {
    let dir = TempDir::new().unwrap();
    let tile = TileId::new(2, 2, 3);

    let first = start(test_config(dir.path()), MemoryFetcher::default()).await;
    first.engine.resolve(&[tile], false);
    wait_until(|| first.engine.stats().admission.completed() == 1).await;
    first.engine.shutdown().await;

    let mut config = test_config(dir.path());
    config.cache.clear_on_start = true;
    let second = start(config, MemoryFetcher::default()).await;
    assert!(!second.engine.disk_cache().path_for(tile).exists());
    second.engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_purge_disk_cache_keeps_decoded_tiles() {
    let dir = TempDir::new().unwrap();
    let h = start(test_config(dir.path()), MemoryFetcher::default()).await;
    let tiles = [TileId::new(0, 0, 2), TileId::new(1, 0, 2)];

    h.engine.resolve(&tiles, false);
    wait_until(|| tiles.iter().all(|t| h.engine.decoded_cache().contains(t))).await;

    let purged = h.engine.purge_disk_cache().await.unwrap();
    assert_eq!(purged.files_removed, 2);
    assert!(h.engine.decoded_cache().contains(&tiles[0]));

    h.engine.purge_decoded_cache();
    assert!(h.engine.resolve(&tiles, true).is_empty());
    h.engine.shutdown().await;
}

// =============================================================================
// Startup validation
// =============================================================================

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.view.tiles_in_direction = 5;
    config.fetch.queue_capacity = 16;

    let result = TileEngineBuilder::new(config, triangle_decoder())
        .build_with_fetcher(MemoryFetcher::default())
        .await;
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_visible_tiles_feed_resolver() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.decode.debounce = Duration::from_secs(30);
    let h = start(config, MemoryFetcher::default()).await;

    let visible = h.engine.visible_tiles(8.5, 8.5, 4);
    assert_eq!(visible.len(), 9);
    assert_eq!(visible[0], TileId::new(8, 8, 4));

    h.engine.resolve(&visible, false);
    wait_until(|| h.engine.stats().debounce.received == 9).await;
    assert_eq!(h.engine.flush().await, 9);

    let fetched = h.fetcher.fetched();
    assert_eq!(fetched.len(), 9);
    assert_eq!(h.engine.resolve(&visible, true).actual.len(), 9);
    h.engine.shutdown().await;
}

// =============================================================================
// Render loop
// =============================================================================

/// Resolves `visible` every 10ms, like a renderer, until every tile is drawn.
async fn render_until_loaded(engine: &TileEngine<MemoryFetcher>, visible: &[TileId]) {
    timeout(Duration::from_secs(3), async {
        loop {
            if engine.resolve(visible, false).actual.len() == visible.len() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("tiles never became resident while resolving every frame");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_frequent_resolves_still_decode_tiles() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.decode.debounce = Duration::from_millis(100);
    let h = start(config, MemoryFetcher::default()).await;
    let visible = h.engine.visible_tiles(8.5, 8.5, 4);
    assert_eq!(visible.len(), 9);

    render_until_loaded(&h.engine, &visible).await;

    assert_eq!(h.fetcher.calls(), 9);
    let stats = h.engine.stats();
    assert_eq!(stats.cache.memory_entry_count, 9);
    assert!(stats.debounce.flushes >= 1);
    assert!(stats.admission.started < 18, "{}", stats);
    wait_until(|| h.engine.stats().awaiting_decode == 0).await;

    // Resident tiles are never requested again.
    let requested = stats.admission.requested;
    for _ in 0..10 {
        h.engine.resolve(&visible, false);
    }
    assert_eq!(h.engine.stats().admission.requested, requested);
    h.engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fetched_tile_is_not_requested_while_awaiting_decode() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.decode.debounce = Duration::from_secs(30);
    let h = start(config, MemoryFetcher::default()).await;
    let tile = TileId::new(3, 3, 3);

    h.engine.resolve(&[tile], false);
    wait_until(|| h.engine.stats().debounce.received == 1).await;

    assert_eq!(h.engine.request(tile), RequestOutcome::AwaitingDecode);
    for _ in 0..20 {
        h.engine.resolve(&[tile], false);
    }
    let stats = h.engine.stats();
    assert_eq!(stats.admission.started, 1);
    assert_eq!(stats.debounce.received, 1);
    assert_eq!(stats.awaiting_decode, 1);

    assert_eq!(h.engine.flush().await, 1);
    assert_eq!(h.engine.stats().awaiting_decode, 0);
    assert_eq!(h.engine.resolve(&[tile], true).actual.len(), 1);
    h.engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_cap_keeps_every_distinct_visible_tile() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.decode.debounce = Duration::from_secs(60);
    let h = start(config, MemoryFetcher::default()).await;
    let visible = h.engine.visible_tiles(8.5, 8.5, 4);
    assert_eq!(visible.len(), 9);

    for _ in 0..30 {
        h.engine.resolve(&visible, false);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    for _ in 0..20 {
        h.engine.resolve(&visible[..1], false);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    wait_until(|| h.engine.stats().debounce.received >= 9).await;

    assert_eq!(h.engine.flush().await, 9);
    let stats = h.engine.stats();
    assert_eq!(stats.debounce.discarded, 0);
    assert_eq!(h.engine.resolve(&visible, true).actual.len(), 9);
    h.engine.shutdown().await;
}
