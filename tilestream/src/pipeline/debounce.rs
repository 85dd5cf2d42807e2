//! Trailing-edge batching of completed fetches.
//!
//! Items pushed into a [`Debouncer`] collect in a window. Each push restarts
//! the quiet-period timer; once nothing has arrived for the configured
//! interval the window is handed to the batch handler in one piece. A flush
//! can also be forced.
//!
//! The window holds at most one item per [`Debounced::key`]. A newer item
//! replaces the older one and moves to the back of the window, so the batch
//! limit counts distinct keys. Only the newest `batch_limit` of them survive
//! a flush; older ones belong to tiles that have almost certainly scrolled
//! out of view.
//!
//! A key is reported by [`Debouncer::contains`] from the moment it is pushed
//! until the handler that received it returns, or until it is discarded.
//!
//! The handler runs on the blocking pool and is awaited before the next
//! window is considered, so two flushes never run at the same time.

use std::collections::HashMap;
use std::future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Default quiet period before a window is flushed.
pub const DEFAULT_DEBOUNCE_INTERVAL: Duration = Duration::from_millis(500);

/// Receives each flushed batch, oldest item first.
pub type BatchHandler<T> = Arc<dyn Fn(Vec<T>) + Send + Sync>;

/// An item that can be superseded by a newer one with the same key.
pub trait Debounced: Send + 'static {
    type Key: Eq + Hash + Copy + Send + Sync + 'static;

    fn key(&self) -> Self::Key;
}

enum Command<T> {
    Item(T),
    Flush(Option<oneshot::Sender<usize>>),
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    replaced: AtomicU64,
    flushes: AtomicU64,
    delivered: AtomicU64,
    discarded: AtomicU64,
}

/// Snapshot of debouncer activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceStats {
    /// Items pushed
    pub received: u64,
    /// Items superseded in the window by a newer item with the same key
    pub replaced: u64,
    /// Non-empty flushes
    pub flushes: u64,
    /// Items handed to the batch handler
    pub delivered: u64,
    /// Items discarded by the batch limit
    pub discarded: u64,
}

/// Keys somewhere between `push` and the end of their batch.
///
/// Counted per item: a key pushed twice is released twice.
struct Waiting<K> {
    counts: Mutex<HashMap<K, usize>>,
}

impl<K: Eq + Hash + Copy> Waiting<K> {
    fn new() -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
        }
    }

    fn add(&self, key: K) {
        *self.counts.lock().entry(key).or_insert(0) += 1;
    }

    fn release_all(&self, keys: impl IntoIterator<Item = K>) {
        let mut counts = self.counts.lock();
        for key in keys {
            if let Some(n) = counts.get_mut(&key) {
                *n -= 1;
                if *n == 0 {
                    counts.remove(&key);
                }
            }
        }
    }

    fn contains(&self, key: &K) -> bool {
        self.counts.lock().contains_key(key)
    }

    fn len(&self) -> usize {
        self.counts.lock().len()
    }
}

/// Collects items and delivers them in quiet-period batches.
pub struct Debouncer<T: Debounced> {
    tx: mpsc::UnboundedSender<Command<T>>,
    batch_limit: Arc<AtomicUsize>,
    counters: Arc<Counters>,
    waiting: Arc<Waiting<T::Key>>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Debounced> Debouncer<T> {
    /// Starts the debouncer task on `runtime`.
    pub fn spawn(
        interval: Duration,
        batch_limit: usize,
        runtime: &Handle,
        handler: BatchHandler<T>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let batch_limit = Arc::new(AtomicUsize::new(batch_limit));
        let counters = Arc::new(Counters::default());
        let waiting = Arc::new(Waiting::new());
        let shutdown = CancellationToken::new();

        let worker = Worker {
            rx,
            interval,
            batch_limit: Arc::clone(&batch_limit),
            counters: Arc::clone(&counters),
            waiting: Arc::clone(&waiting),
            shutdown: shutdown.clone(),
            handler,
            window: Vec::new(),
        };
        let task = runtime.spawn(worker.run());

        Self {
            tx,
            batch_limit,
            counters,
            waiting,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    /// Adds an item to the current window and restarts the timer.
    ///
    /// Counted as received once it is on the channel, so a later
    /// [`flush`](Self::flush) is guaranteed to see it.
    pub fn push(&self, item: T) {
        let key = item.key();
        self.waiting.add(key);
        if self.tx.send(Command::Item(item)).is_err() {
            self.waiting.release_all([key]);
            trace!("Debouncer stopped, item discarded");
            return;
        }
        self.counters.received.fetch_add(1, Ordering::SeqCst);
    }

    /// True while an item with `key` is in the window or its batch is
    /// still being handled.
    pub fn contains(&self, key: &T::Key) -> bool {
        self.waiting.contains(key)
    }

    /// Number of distinct keys waiting.
    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    /// Asks for an immediate flush without waiting for it.
    pub fn request_flush(&self) {
        let _ = self.tx.send(Command::Flush(None));
    }

    /// Flushes the current window now and waits for the handler to finish.
    ///
    /// Returns the number of items delivered.
    pub async fn flush(&self) -> usize {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Command::Flush(Some(reply))).is_err() {
            return 0;
        }
        done.await.unwrap_or(0)
    }

    /// Caps how many items a single flush delivers.
    pub fn set_batch_limit(&self, limit: usize) {
        self.batch_limit.store(limit, Ordering::Relaxed);
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> DebounceStats {
        DebounceStats {
            received: self.counters.received.load(Ordering::SeqCst),
            replaced: self.counters.replaced.load(Ordering::Relaxed),
            flushes: self.counters.flushes.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
        }
    }

    /// Stops the task. Items still in the window are discarded.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Debouncer task ended abnormally");
            }
        }
    }
}

impl<T: Debounced> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct Worker<T: Debounced> {
    rx: mpsc::UnboundedReceiver<Command<T>>,
    interval: Duration,
    batch_limit: Arc<AtomicUsize>,
    counters: Arc<Counters>,
    waiting: Arc<Waiting<T::Key>>,
    shutdown: CancellationToken,
    handler: BatchHandler<T>,
    window: Vec<(T, Instant)>,
}

impl<T: Debounced> Worker<T> {
    async fn run(mut self) {
        let mut deadline: Option<Instant> = None;

        loop {
            let quiet = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => future::pending().await,
                }
            };

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                command = self.rx.recv() => match command {
                    Some(Command::Item(item)) => {
                        let now = Instant::now();
                        self.insert(item, now);
                        deadline = Some(now + self.interval);
                    }
                    Some(Command::Flush(reply)) => {
                        let delivered = self.flush().await;
                        deadline = None;
                        if let Some(reply) = reply {
                            let _ = reply.send(delivered);
                        }
                    }
                    None => break,
                },
                _ = quiet => {
                    self.flush().await;
                    deadline = None;
                }
            }
        }

        // Items still on the channel never reach a batch either.
        self.rx.close();
        while let Ok(command) = self.rx.try_recv() {
            if let Command::Item(item) = command {
                self.window.push((item, Instant::now()));
            }
        }

        if !self.window.is_empty() {
            debug!(discarded = self.window.len(), "Debouncer stopped with items pending");
            let window = std::mem::take(&mut self.window);
            self.waiting
                .release_all(window.iter().map(|(item, _)| item.key()));
        }
    }

    /// Appends `item`, dropping an older item with the same key.
    fn insert(&mut self, item: T, now: Instant) {
        let key = item.key();
        if let Some(pos) = self.window.iter().position(|(queued, _)| queued.key() == key) {
            self.window.remove(pos);
            self.waiting.release_all([key]);
            self.counters.replaced.fetch_add(1, Ordering::Relaxed);
        }
        self.window.push((item, now));
    }

    async fn flush(&mut self) -> usize {
        if self.window.is_empty() {
            return 0;
        }

        let mut batch = std::mem::take(&mut self.window);
        let limit = self.batch_limit.load(Ordering::Relaxed);
        if batch.len() > limit {
            let excess = batch.len() - limit;
            self.waiting
                .release_all(batch.drain(..excess).map(|(item, _)| item.key()));
            self.counters.discarded.fetch_add(excess as u64, Ordering::Relaxed);
            debug!(discarded = excess, limit, "Batch over limit, keeping newest");
        }
        if batch.is_empty() {
            return 0;
        }

        let oldest_ms = batch[0].1.elapsed().as_millis() as u64;
        let keys: Vec<T::Key> = batch.iter().map(|(item, _)| item.key()).collect();
        let items: Vec<T> = batch.into_iter().map(|(item, _)| item).collect();
        let count = items.len();
        trace!(count, oldest_ms, "Flushing batch");

        let handler = Arc::clone(&self.handler);
        if let Err(e) = tokio::task::spawn_blocking(move || handler(items)).await {
            warn!(error = %e, "Batch handler failed");
        }
        self.waiting.release_all(keys);

        self.counters.flushes.fetch_add(1, Ordering::Relaxed);
        self.counters.delivered.fetch_add(count as u64, Ordering::Relaxed);
        count
    }
}
