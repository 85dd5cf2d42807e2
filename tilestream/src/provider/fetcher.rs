//! HTTP tile fetcher.

use super::http::AsyncHttpClient;
use super::types::{ProviderError, TileFetcher};
use super::url::TileUrlBuilder;
use crate::coord::TileId;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Downloads tiles over HTTP from URLs produced by a [`TileUrlBuilder`].
pub struct HttpTileFetcher<C: AsyncHttpClient> {
    http_client: C,
    urls: Arc<dyn TileUrlBuilder>,
}

impl<C: AsyncHttpClient> HttpTileFetcher<C> {
    pub fn new(http_client: C, urls: Arc<dyn TileUrlBuilder>) -> Self {
        Self { http_client, urls }
    }
}

impl<C: AsyncHttpClient> TileFetcher for HttpTileFetcher<C> {
    async fn fetch(&self, id: TileId) -> Result<Bytes, ProviderError> {
        if !self.supports_zoom(id.z) {
            return Err(ProviderError::UnsupportedZoom(id.z));
        }

        let url = self.urls.url(id);
        let bytes = self.http_client.get(&url).await?;
        if bytes.is_empty() {
            return Err(ProviderError::EmptyResponse(id));
        }

        debug!(tile = %id, bytes = bytes.len(), provider = self.name(), "Tile downloaded");
        Ok(bytes)
    }

    fn name(&self) -> &str {
        self.urls.name()
    }

    fn max_zoom(&self) -> u8 {
        self.urls.max_zoom()
    }
}
