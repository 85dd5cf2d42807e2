//! Tile download abstraction
//!
//! A [`TileFetcher`] turns a tile id into raw bytes. The standard
//! implementation, [`HttpTileFetcher`], combines an [`AsyncHttpClient`] with
//! a [`TileUrlBuilder`]:
//!
//! ```ignore
//! use tilestream::provider::{HttpClientConfig, ProviderConfig, TileFetcher};
//!
//! let fetcher = ProviderConfig::mapbox(token).build_fetcher(&HttpClientConfig::default())?;
//! let bytes = fetcher.fetch(TileId::new(4823, 6160, 14)).await?;
//! ```

mod factory;
mod fetcher;
mod http;
mod types;
mod url;

pub use factory::ProviderConfig;
pub use fetcher::HttpTileFetcher;
pub use http::{
    AsyncHttpClient, HttpClientConfig, ReqwestClient, DEFAULT_HTTP_TIMEOUT, DEFAULT_USER_AGENT,
};
pub use types::{ProviderError, TileFetcher};
pub use url::{MapBoxVectorUrl, TemplateUrl, TileUrlBuilder, DEFAULT_MAPBOX_TILESETS};

#[cfg(test)]
pub use http::tests::MockHttpClient;
