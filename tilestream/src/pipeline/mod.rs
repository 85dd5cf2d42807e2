//! Tile loading pipeline.
//!
//! Moves a tile from "requested" to "resident in the decoded cache".
//!
//! # Architecture
//!
//! ```text
//! TileResolver ──request(id)──► AdmissionController ──► DiskCache ─miss─► TileFetcher
//!                                      │                     │                 │
//!                                      │◄────── bytes ───────┴─────────────────┘
//!                                      ▼
//!                                 Debouncer<RawTile>
//!                                      │ quiet period or forced flush
//!                                      ▼
//!                                 TileUploader ──► DecodedTileCache ──► tiles changed
//! ```
//!
//! # Key Components
//!
//! - [`AdmissionController`] - bounds concurrent fetches and deduplicates requests
//! - [`OverflowQueue`] - FIFO of tiles waiting for an admission slot
//! - [`Debouncer`] - collects completed fetches into batches, one entry per tile
//! - [`TileUploader`] - decodes a batch and publishes it to the decoded cache
//!
//! Fetch failures surface as an absent payload and are skipped. Nothing in
//! the pipeline retries on its own; a tile that did not load is requested
//! again on the next resolve pass that still needs it.

mod admission;
mod debounce;
mod overflow;
mod upload;

pub use admission::{
    AdmissionConfig, AdmissionController, AdmissionStats, FetchCallback, FetchSource,
    RequestOutcome, DEFAULT_MAX_CONCURRENT, DEFAULT_QUEUE_CAPACITY,
};
pub use debounce::{
    BatchHandler, DebounceStats, Debounced, Debouncer, DEFAULT_DEBOUNCE_INTERVAL,
};
pub use overflow::{OverflowQueue, PushOutcome};
pub use upload::{BatchReport, TileUploader, TilesChangedCallback, UploadError, UploadStats};
