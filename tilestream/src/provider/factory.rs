//! Provider configuration and construction.

use super::fetcher::HttpTileFetcher;
use super::http::{HttpClientConfig, ReqwestClient};
use super::types::ProviderError;
use super::url::{MapBoxVectorUrl, TemplateUrl, TileUrlBuilder};
use std::sync::Arc;

/// Which tile source to download from.
///
/// # Example
///
/// ```
/// use tilestream::provider::ProviderConfig;
///
/// let mapbox = ProviderConfig::mapbox("pk.your-token");
/// let custom = ProviderConfig::template("https://tiles.example.com/{z}/{x}/{y}.mvt", 14);
/// assert!(mapbox.validate().is_ok());
/// assert!(custom.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    /// MapBox vector tiles.
    ///
    /// Requires a MapBox access token.
    MapBox {
        access_token: String,
        /// Tilesets to composite; `None` uses streets plus terrain.
        tilesets: Option<String>,
    },

    /// Any XYZ server described by a `{z}/{x}/{y}` URL template.
    Template { url: String, max_zoom: u8 },
}

impl ProviderConfig {
    pub fn mapbox(access_token: impl Into<String>) -> Self {
        Self::MapBox {
            access_token: access_token.into(),
            tilesets: None,
        }
    }

    pub fn template(url: impl Into<String>, max_zoom: u8) -> Self {
        Self::Template {
            url: url.into(),
            max_zoom,
        }
    }

    /// Short provider type name, as written in the config file.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MapBox { .. } => "mapbox",
            Self::Template { .. } => "template",
        }
    }

    /// Checks that required settings are present.
    pub fn validate(&self) -> Result<(), ProviderError> {
        self.url_builder().map(|_| ())
    }

    pub fn url_builder(&self) -> Result<Arc<dyn TileUrlBuilder>, ProviderError> {
        match self {
            Self::MapBox {
                access_token,
                tilesets,
            } => {
                if access_token.trim().is_empty() {
                    return Err(ProviderError::InvalidConfig(
                        "MapBox requires an access token".to_string(),
                    ));
                }
                let mut builder = MapBoxVectorUrl::new(access_token.trim());
                if let Some(tilesets) = tilesets {
                    builder = builder.with_tilesets(tilesets.clone());
                }
                Ok(Arc::new(builder))
            }
            Self::Template { url, max_zoom } => {
                Ok(Arc::new(TemplateUrl::new(url.clone(), *max_zoom)?))
            }
        }
    }

    /// Builds an HTTP fetcher for this source.
    pub fn build_fetcher(
        &self,
        http: &HttpClientConfig,
    ) -> Result<HttpTileFetcher<ReqwestClient>, ProviderError> {
        let urls = self.url_builder()?;
        let client = ReqwestClient::with_config(http)?;
        Ok(HttpTileFetcher::new(client, urls))
    }
}
