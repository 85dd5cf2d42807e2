//! Fetch admission control.
//!
//! Every tile fetch goes through the [`AdmissionController`], which keeps the
//! number of in-flight fetches under a fixed ceiling and makes sure no tile
//! is ever fetched twice at the same time.
//!
//! # Architecture
//!
//! ```text
//!   request(id)
//!        │
//!        ▼
//!   ┌─────────┐ pending ┌──────────────┐
//!   │ pending │────────►│AlreadyPending│
//!   │  set    │         └──────────────┘
//!   └────┬────┘
//!        │ below ceiling                 at ceiling
//!        ├──────────────────┐ ─────────────────────────┐
//!        ▼                  │                          ▼
//!   ┌──────────┐   miss  ┌────────┐            ┌──────────────┐
//!   │DiskCache │────────►│Fetcher │            │OverflowQueue │
//!   └────┬─────┘         └───┬────┘            └──────┬───────┘
//!        │ hit               │ store on success       │
//!        └───────┬───────────┘                        │
//!                ▼                                    │
//!          completion ──── pop oldest, admit ─────────┘
//!                │
//!                ▼
//!        on_complete(id, bytes)
//! ```
//!
//! Admission state lives behind a single mutex. A completion removes its
//! tile from the pending set and admits the next queued tile in the same
//! critical section, so the ceiling holds under any interleaving.

use super::overflow::{OverflowQueue, PushOutcome};
use crate::cache::DiskCache;
use crate::coord::TileId;
use crate::provider::TileFetcher;
use crate::resolver::TileRequester;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

/// Default ceiling on concurrent fetches.
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Default overflow queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Invoked once per admitted tile when its fetch finishes.
///
/// `None` means both the disk cache and the network failed to produce bytes.
pub type FetchCallback = Arc<dyn Fn(TileId, Option<Bytes>) + Send + Sync>;

/// Admission limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Maximum number of fetches in flight.
    pub max_concurrent: usize,
    /// Overflow queue capacity. Should cover one screen of tiles.
    pub queue_capacity: usize,
    /// After a network failure, further requests for the same tile are
    /// refused for this long. `None` disables the cooldown.
    pub failure_cooldown: Option<Duration>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            failure_cooldown: None,
        }
    }
}

/// What happened to a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A fetch was started.
    Started,
    /// A fetch for this tile is already in flight.
    AlreadyPending,
    /// Ceiling reached; the tile waits in the overflow queue.
    Queued,
    /// The tile is already waiting in the overflow queue.
    AlreadyQueued,
    /// Ceiling reached and the overflow queue is full.
    Dropped,
    /// The tile failed recently and is inside its cooldown window.
    CoolingDown,
    /// The tile's bytes are already waiting to be decoded. Reported by the
    /// engine, which checks the decode window before admission.
    AwaitingDecode,
}

/// Where a completed fetch got its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Disk,
    Network,
}

/// Admission counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionStats {
    /// Total calls to `request`
    pub requested: u64,
    /// Fetches started, including ones admitted from the queue
    pub started: u64,
    /// Requests for tiles already pending or queued
    pub deduplicated: u64,
    /// Requests parked in the overflow queue
    pub queued: u64,
    /// Requests dropped because the queue was full
    pub dropped: u64,
    /// Requests refused during a failure cooldown
    pub cooling_down: u64,
    /// Fetches served from the disk cache
    pub disk_hits: u64,
    /// Fetches served from the network
    pub network_fetches: u64,
    /// Fetches that produced no bytes
    pub failures: u64,
    /// Highest pending count observed
    pub peak_pending: usize,
}

impl AdmissionStats {
    pub fn completed(&self) -> u64 {
        self.disk_hits + self.network_fetches + self.failures
    }
}

struct AdmissionState {
    pending: HashSet<TileId>,
    overflow: OverflowQueue,
    failures: HashMap<TileId, Instant>,
    stats: AdmissionStats,
}

impl AdmissionState {
    fn admit(&mut self, id: TileId) {
        self.pending.insert(id);
        self.stats.started += 1;
        self.stats.peak_pending = self.stats.peak_pending.max(self.pending.len());
    }

    /// Forgets failures whose cooldown has run out.
    fn prune_failures(&mut self, cooldown: Option<Duration>) {
        match cooldown {
            Some(cooldown) if !self.failures.is_empty() => {
                self.failures.retain(|_, failed_at| failed_at.elapsed() < cooldown);
            }
            _ => {}
        }
    }

    /// True while `id` is inside its failure cooldown. Expired records are
    /// dropped on the way.
    fn cooling_down(&mut self, id: TileId, cooldown: Option<Duration>) -> bool {
        let Some(cooldown) = cooldown else {
            return false;
        };
        match self.failures.get(&id) {
            Some(failed_at) if failed_at.elapsed() < cooldown => true,
            Some(_) => {
                self.failures.remove(&id);
                false
            }
            None => false,
        }
    }
}

struct Inner<F> {
    config: AdmissionConfig,
    disk: Arc<DiskCache>,
    fetcher: Arc<F>,
    on_complete: FetchCallback,
    runtime: Handle,
    state: Mutex<AdmissionState>,
}

/// Bounds and deduplicates tile fetches.
///
/// Cheap to clone; clones share the same admission state.
pub struct AdmissionController<F: TileFetcher + 'static> {
    inner: Arc<Inner<F>>,
}

impl<F: TileFetcher + 'static> Clone for AdmissionController<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: TileFetcher + 'static> AdmissionController<F> {
    /// Creates a controller that spawns its fetches on `runtime`.
    pub fn new(
        config: AdmissionConfig,
        disk: Arc<DiskCache>,
        fetcher: Arc<F>,
        on_complete: FetchCallback,
        runtime: Handle,
    ) -> Self {
        let overflow = OverflowQueue::new(config.queue_capacity);
        Self {
            inner: Arc::new(Inner {
                config,
                disk,
                fetcher,
                on_complete,
                runtime,
                state: Mutex::new(AdmissionState {
                    pending: HashSet::new(),
                    overflow,
                    failures: HashMap::new(),
                    stats: AdmissionStats::default(),
                }),
            }),
        }
    }

    /// Requests a tile.
    ///
    /// Never blocks on I/O. The outcome is informational; callers that only
    /// care about the eventual bytes can ignore it.
    pub fn request(&self, id: TileId) -> RequestOutcome {
        let cooldown = self.inner.config.failure_cooldown;
        let mut state = self.inner.state.lock();
        state.stats.requested += 1;

        if state.pending.contains(&id) {
            state.stats.deduplicated += 1;
            return RequestOutcome::AlreadyPending;
        }
        if state.overflow.contains(&id) {
            state.stats.deduplicated += 1;
            return RequestOutcome::AlreadyQueued;
        }
        if state.cooling_down(id, cooldown) {
            state.stats.cooling_down += 1;
            trace!(tile = %id, "Tile in failure cooldown");
            return RequestOutcome::CoolingDown;
        }

        if state.pending.len() >= self.inner.config.max_concurrent {
            return match state.overflow.push(id) {
                PushOutcome::Queued => {
                    state.stats.queued += 1;
                    trace!(tile = %id, queued = state.overflow.len(), "Tile queued");
                    RequestOutcome::Queued
                }
                PushOutcome::AlreadyQueued => {
                    state.stats.deduplicated += 1;
                    RequestOutcome::AlreadyQueued
                }
                PushOutcome::Full => {
                    state.stats.dropped += 1;
                    debug!(
                        tile = %id,
                        capacity = state.overflow.capacity(),
                        "Overflow queue full, dropping request"
                    );
                    RequestOutcome::Dropped
                }
            };
        }

        state.admit(id);
        drop(state);

        Inner::start(&self.inner, id);
        RequestOutcome::Started
    }

    /// Number of fetches in flight.
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Number of tiles waiting in the overflow queue.
    pub fn queued_count(&self) -> usize {
        self.inner.state.lock().overflow.len()
    }

    pub fn is_pending(&self, id: TileId) -> bool {
        self.inner.state.lock().pending.contains(&id)
    }

    /// Drops every queued tile. In-flight fetches are unaffected.
    pub fn clear_queue(&self) -> usize {
        let mut state = self.inner.state.lock();
        let cleared = state.overflow.len();
        state.overflow.clear();
        cleared
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> AdmissionStats {
        self.inner.state.lock().stats.clone()
    }
}

impl<F: TileFetcher + 'static> TileRequester for AdmissionController<F> {
    fn request(&self, id: TileId) {
        AdmissionController::request(self, id);
    }
}

impl<F: TileFetcher + 'static> Inner<F> {
    fn start(this: &Arc<Self>, id: TileId) {
        let inner = Arc::clone(this);
        this.runtime.spawn(async move {
            let outcome = inner.fetch(id).await;
            Inner::complete(&inner, id, outcome);
        });
    }

    /// Disk cache first, then the network. Network bytes are written back to
    /// disk before completion is reported.
    async fn fetch(&self, id: TileId) -> Option<(Bytes, FetchSource)> {
        if let Some(bytes) = self.disk.get(id).await {
            trace!(tile = %id, "Disk cache hit");
            return Some((bytes, FetchSource::Disk));
        }

        match self.fetcher.fetch(id).await {
            Ok(bytes) => {
                if let Err(e) = self.disk.put(id, &bytes).await {
                    warn!(tile = %id, error = %e, "Failed to store tile on disk");
                }
                debug!(tile = %id, size = bytes.len(), provider = self.fetcher.name(), "Tile fetched");
                Some((bytes, FetchSource::Network))
            }
            Err(e) => {
                warn!(tile = %id, provider = self.fetcher.name(), error = %e, "Tile fetch failed");
                None
            }
        }
    }

    fn complete(this: &Arc<Self>, id: TileId, outcome: Option<(Bytes, FetchSource)>) {
        let cooldown = this.config.failure_cooldown;
        let next = {
            let mut state = this.state.lock();
            state.pending.remove(&id);
            state.prune_failures(cooldown);

            match &outcome {
                Some((_, FetchSource::Disk)) => {
                    state.stats.disk_hits += 1;
                    state.failures.remove(&id);
                }
                Some((_, FetchSource::Network)) => {
                    state.stats.network_fetches += 1;
                    state.failures.remove(&id);
                }
                None => {
                    state.stats.failures += 1;
                    if cooldown.is_some() {
                        state.failures.insert(id, Instant::now());
                    }
                }
            }

            let mut next = None;
            while let Some(candidate) = state.overflow.pop() {
                if state.cooling_down(candidate, cooldown) {
                    state.stats.cooling_down += 1;
                    continue;
                }
                state.admit(candidate);
                next = Some(candidate);
                break;
            }
            next
        };

        if let Some(next) = next {
            trace!(tile = %next, "Admitting queued tile");
            Inner::start(this, next);
        }

        (this.on_complete)(id, outcome.map(|(bytes, _)| bytes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DiskCacheConfig;
    use crate::provider::ProviderError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::sync::{mpsc, Semaphore};
    use tokio::time::timeout;

    /// Fetcher that blocks until the test hands out permits.
    struct GatedFetcher {
        gate: Semaphore,
        calls: AtomicUsize,
        fail: bool,
    }

    impl GatedFetcher {
        fn new(fail: bool) -> Self {
            Self {
                gate: Semaphore::new(0),
                calls: AtomicUsize::new(0),
                fail,
            }
        }

        fn open(permits: usize) -> Self {
            let fetcher = Self::new(false);
            fetcher.gate.add_permits(permits);
            fetcher
        }
    }

    impl TileFetcher for GatedFetcher {
        async fn fetch(&self, id: TileId) -> Result<Bytes, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate
                .acquire()
                .await
                .map_err(|e| ProviderError::HttpError(e.to_string()))?
                .forget();
            if self.fail {
                Err(ProviderError::EmptyResponse(id))
            } else {
                Ok(Bytes::from(id.key()))
            }
        }

        fn name(&self) -> &str {
            "gated"
        }

        fn max_zoom(&self) -> u8 {
            22
        }
    }

    struct Fixture {
        controller: AdmissionController<GatedFetcher>,
        fetcher: Arc<GatedFetcher>,
        disk: Arc<DiskCache>,
        completions: mpsc::UnboundedReceiver<(TileId, Option<Bytes>)>,
        _dir: TempDir,
    }

    async fn fixture(config: AdmissionConfig, fetcher: GatedFetcher) -> Fixture {
        let dir = TempDir::new().unwrap();
        let disk = Arc::new(DiskCache::open(DiskCacheConfig::new(dir.path())).await.unwrap());
        let fetcher = Arc::new(fetcher);
        let (tx, completions) = mpsc::unbounded_channel();
        let on_complete: FetchCallback = Arc::new(move |id: TileId, bytes: Option<Bytes>| {
            let _ = tx.send((id, bytes));
        });
        let controller = AdmissionController::new(
            config,
            Arc::clone(&disk),
            Arc::clone(&fetcher),
            on_complete,
            Handle::current(),
        );
        Fixture {
            controller,
            fetcher,
            disk,
            completions,
            _dir: dir,
        }
    }

    async fn next_completion(fixture: &mut Fixture) -> (TileId, Option<Bytes>) {
        timeout(Duration::from_secs(5), fixture.completions.recv())
            .await
            .expect("completion timed out")
            .expect("callback channel closed")
    }

    fn config(max_concurrent: usize, queue_capacity: usize) -> AdmissionConfig {
        AdmissionConfig {
            max_concurrent,
            queue_capacity,
            failure_cooldown: None,
        }
    }

    fn tile(x: u32) -> TileId {
        TileId::new(x, 3, 5)
    }

    #[tokio::test]
    async fn test_network_fetch_completes_and_writes_disk() {
        let mut f = fixture(config(2, 4), GatedFetcher::open(1)).await;

        assert_eq!(f.controller.request(tile(1)), RequestOutcome::Started);
        let (id, bytes) = next_completion(&mut f).await;

        assert_eq!(id, tile(1));
        assert_eq!(bytes.unwrap(), Bytes::from(tile(1).key()));
        assert!(f.disk.get(tile(1)).await.is_some());
        assert_eq!(f.controller.pending_count(), 0);
        assert_eq!(f.controller.stats().network_fetches, 1);
    }

    #[tokio::test]
    async fn test_disk_hit_skips_network() {
        let mut f = fixture(config(2, 4), GatedFetcher::new(false)).await;
        f.disk.put(tile(1), b"cached").await.unwrap();

        f.controller.request(tile(1));
        let (_, bytes) = next_completion(&mut f).await;

        assert_eq!(bytes.unwrap().as_ref(), b"cached");
        assert_eq!(f.fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.controller.stats().disk_hits, 1);
    }

    #[tokio::test]
    async fn test_duplicate_request_while_pending() {
        let mut f = fixture(config(2, 4), GatedFetcher::new(false)).await;

        assert_eq!(f.controller.request(tile(1)), RequestOutcome::Started);
        assert_eq!(f.controller.request(tile(1)), RequestOutcome::AlreadyPending);
        assert_eq!(f.controller.pending_count(), 1);

        f.fetcher.gate.add_permits(1);
        next_completion(&mut f).await;
        tokio::task::yield_now().await;

        assert_eq!(f.fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.controller.stats().deduplicated, 1);
    }

    #[tokio::test]
    async fn test_ceiling_queues_then_drops() {
        let f = fixture(config(2, 2), GatedFetcher::new(false)).await;

        assert_eq!(f.controller.request(tile(1)), RequestOutcome::Started);
        assert_eq!(f.controller.request(tile(2)), RequestOutcome::Started);
        assert_eq!(f.controller.request(tile(3)), RequestOutcome::Queued);
        assert_eq!(f.controller.request(tile(3)), RequestOutcome::AlreadyQueued);
        assert_eq!(f.controller.request(tile(4)), RequestOutcome::Queued);
        assert_eq!(f.controller.request(tile(5)), RequestOutcome::Dropped);

        assert_eq!(f.controller.pending_count(), 2);
        assert_eq!(f.controller.queued_count(), 2);
        let stats = f.controller.stats();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.queued, 2);
    }

    #[tokio::test]
    async fn test_completion_admits_oldest_queued_tile() {
        let mut f = fixture(config(1, 4), GatedFetcher::new(false)).await;

        f.controller.request(tile(1));
        f.controller.request(tile(2));
        f.controller.request(tile(3));
        assert_eq!(f.controller.queued_count(), 2);

        f.fetcher.gate.add_permits(1);
        let (first, _) = next_completion(&mut f).await;
        assert_eq!(first, tile(1));
        assert!(f.controller.is_pending(tile(2)));
        assert_eq!(f.controller.queued_count(), 1);

        f.fetcher.gate.add_permits(2);
        let (second, _) = next_completion(&mut f).await;
        let (third, _) = next_completion(&mut f).await;
        assert_eq!((second, third), (tile(2), tile(3)));

        let stats = f.controller.stats();
        assert_eq!(stats.peak_pending, 1);
        assert_eq!(stats.started, 3);
    }

    #[tokio::test]
    async fn test_pending_never_exceeds_ceiling() {
        let mut f = fixture(config(3, 16), GatedFetcher::new(false)).await;

        for x in 0..12 {
            f.controller.request(tile(x));
            assert!(f.controller.pending_count() <= 3);
        }

        f.fetcher.gate.add_permits(12);
        for _ in 0..12 {
            next_completion(&mut f).await;
            assert!(f.controller.pending_count() <= 3);
        }

        assert_eq!(f.controller.stats().peak_pending, 3);
        assert_eq!(f.controller.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_reports_none_and_allows_retry() {
        let mut f = fixture(config(2, 4), GatedFetcher::new(true)).await;
        f.fetcher.gate.add_permits(2);

        f.controller.request(tile(1));
        let (id, bytes) = next_completion(&mut f).await;
        assert_eq!(id, tile(1));
        assert!(bytes.is_none());
        assert!(f.disk.get(tile(1)).await.is_none());

        assert_eq!(f.controller.request(tile(1)), RequestOutcome::Started);
        next_completion(&mut f).await;
        assert_eq!(f.controller.stats().failures, 2);
    }

    #[tokio::test]
    async fn test_failure_cooldown_refuses_requests() {
        let config = AdmissionConfig {
            failure_cooldown: Some(Duration::from_secs(60)),
            ..config(2, 4)
        };
        let mut f = fixture(config, GatedFetcher::new(true)).await;
        f.fetcher.gate.add_permits(1);

        f.controller.request(tile(1));
        next_completion(&mut f).await;

        assert_eq!(f.controller.request(tile(1)), RequestOutcome::CoolingDown);
        assert_eq!(f.controller.request(tile(2)), RequestOutcome::Started);
        assert_eq!(f.controller.stats().cooling_down, 1);
    }

    #[tokio::test]
    async fn test_expired_failures_are_pruned_on_completion() {
        let config = AdmissionConfig {
            failure_cooldown: Some(Duration::from_millis(50)),
            ..config(4, 4)
        };
        let mut f = fixture(config, GatedFetcher::new(true)).await;
        f.fetcher.gate.add_permits(2);

        f.controller.request(tile(1));
        next_completion(&mut f).await;
        assert_eq!(f.controller.inner.state.lock().failures.len(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        f.controller.request(tile(2));
        next_completion(&mut f).await;

        let state = f.controller.inner.state.lock();
        assert_eq!(state.failures.len(), 1);
        assert!(state.failures.contains_key(&tile(2)));
    }

    #[tokio::test]
    async fn test_clear_queue_keeps_in_flight() {
        let f = fixture(config(1, 4), GatedFetcher::new(false)).await;
        f.controller.request(tile(1));
        f.controller.request(tile(2));
        f.controller.request(tile(3));

        assert_eq!(f.controller.clear_queue(), 2);
        assert_eq!(f.controller.queued_count(), 0);
        assert!(f.controller.is_pending(tile(1)));
    }
}
