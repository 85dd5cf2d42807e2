//! Engine builder.
//!
//! Wires the caches, the admission controller, the debouncer and the
//! uploader together from one validated [`ConfigFile`].

use std::sync::Arc;

use bytes::Bytes;
use tokio::runtime::Handle;
use tracing::info;

use super::error::EngineError;
use super::{EngineRequester, TileEngine};
use crate::cache::{DecodedTileCache, DiskCache};
use crate::config::ConfigFile;
use crate::coord::TileId;
use crate::decode::{MapStyle, TileDecoder};
use crate::gpu::{GraphicsDevice, HostDevice};
use crate::pipeline::{
    AdmissionController, BatchHandler, Debouncer, FetchCallback, TileUploader,
    TilesChangedCallback,
};
use crate::provider::{HttpTileFetcher, ReqwestClient, TileFetcher};
use crate::resolver::{TileRequester, TileResolver};
use crate::tile::RawTile;

/// Builds a [`TileEngine`].
///
/// Only the configuration and the decoder are required. The device defaults
/// to [`HostDevice`], the style to `[decode] style`, and the runtime to the
/// one the builder is awaited on.
pub struct TileEngineBuilder {
    config: ConfigFile,
    decoder: Arc<dyn TileDecoder>,
    device: Option<Arc<dyn GraphicsDevice>>,
    style: Option<Arc<dyn MapStyle>>,
    on_tiles_changed: Option<TilesChangedCallback>,
    runtime: Option<Handle>,
}

impl TileEngineBuilder {
    pub fn new(config: ConfigFile, decoder: Arc<dyn TileDecoder>) -> Self {
        Self {
            config,
            decoder,
            device: None,
            style: None,
            on_tiles_changed: None,
            runtime: None,
        }
    }

    /// Device that receives decoded geometry.
    pub fn device(mut self, device: Arc<dyn GraphicsDevice>) -> Self {
        self.device = Some(device);
        self
    }

    /// Overrides the configured map style.
    pub fn style(mut self, style: Arc<dyn MapStyle>) -> Self {
        self.style = Some(style);
        self
    }

    /// Called once after every batch that uploaded at least one tile.
    pub fn on_tiles_changed(mut self, callback: TilesChangedCallback) -> Self {
        self.on_tiles_changed = Some(callback);
        self
    }

    /// Runtime that runs fetches and the debouncer.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds an engine that downloads from the configured provider.
    pub async fn build(self) -> Result<TileEngine<HttpTileFetcher<ReqwestClient>>, EngineError> {
        self.config.validate()?;
        let fetcher = self
            .config
            .provider_config()?
            .build_fetcher(&self.config.http_client_config())?;
        self.build_with_fetcher(fetcher).await
    }

    /// Builds an engine around a caller-supplied fetcher.
    pub async fn build_with_fetcher<F>(self, fetcher: F) -> Result<TileEngine<F>, EngineError>
    where
        F: TileFetcher + 'static,
    {
        let config = self.config;
        config.validate()?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| EngineError::Runtime(e.to_string()))?,
        };

        let disk = Arc::new(DiskCache::open(config.disk_cache_config()).await?);
        let memory = Arc::new(DecodedTileCache::new(config.memory_cache_config()));

        let device = self
            .device
            .unwrap_or_else(|| Arc::new(HostDevice::new()) as Arc<dyn GraphicsDevice>);
        let style = self
            .style
            .unwrap_or_else(|| Arc::from(config.map_style()));

        let mut uploader = TileUploader::new(device, self.decoder, style, Arc::clone(&memory))
            .with_placement(config.placement());
        if let Some(callback) = self.on_tiles_changed {
            uploader = uploader.with_tiles_changed(callback);
        }
        let uploader = Arc::new(uploader);

        let batch_uploader = Arc::clone(&uploader);
        let handler: BatchHandler<RawTile> = Arc::new(move |batch: Vec<RawTile>| {
            batch_uploader.process_batch(batch);
        });
        let debouncer = Arc::new(Debouncer::spawn(
            config.decode.debounce,
            config.visible_tile_count(),
            &runtime,
            handler,
        ));

        let sink = Arc::clone(&debouncer);
        let on_complete: FetchCallback = Arc::new(move |id: TileId, bytes: Option<Bytes>| {
            if let Some(bytes) = bytes {
                sink.push(RawTile::new(id, bytes));
            }
        });

        let fetcher = Arc::new(fetcher);
        let provider = fetcher.name().to_string();
        let admission = AdmissionController::new(
            config.admission_config(),
            Arc::clone(&disk),
            fetcher,
            on_complete,
            runtime,
        );

        let requester = Arc::new(EngineRequester {
            admission: admission.clone(),
            debouncer: Arc::clone(&debouncer),
        });
        let resolver = TileResolver::new(
            Arc::clone(&memory),
            Some(Arc::clone(&requester) as Arc<dyn TileRequester>),
        );

        info!(
            provider = %provider,
            cache_dir = %disk.directory().display(),
            memory_budget = config.cache.memory_budget,
            max_concurrent = config.fetch.max_concurrent,
            visible_tiles = config.visible_tile_count(),
            "Tile engine started"
        );

        Ok(TileEngine {
            grid: config.visible_grid(),
            placement: config.placement(),
            config,
            disk,
            memory,
            admission,
            debouncer,
            requester,
            uploader,
            resolver,
        })
    }
}
