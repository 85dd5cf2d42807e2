//! Tile URL builders.
//!
//! A [`TileUrlBuilder`] maps a tile id to the URL it is downloaded from,
//! keeping the fetcher independent of any one provider's URL scheme.

use super::types::ProviderError;
use crate::coord::TileId;

/// Builds the download URL for a tile.
pub trait TileUrlBuilder: Send + Sync {
    fn url(&self, id: TileId) -> String;

    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Deepest zoom the source serves.
    fn max_zoom(&self) -> u8;
}

/// Base URL of the MapBox vector tiles API.
const MAPBOX_BASE_URL: &str = "https://api.mapbox.com/v4";

/// Streets plus terrain, composited server side.
pub const DEFAULT_MAPBOX_TILESETS: &str = "mapbox.mapbox-streets-v8,mapbox.mapbox-terrain-v2";

/// MapBox serves vector tiles up to zoom 16 and overzooms beyond.
const MAPBOX_MAX_ZOOM: u8 = 16;

/// MapBox vector tiles.
///
/// # URL Pattern
///
/// `https://api.mapbox.com/v4/{tilesets}/{z}/{x}/{y}.mvt?access_token={token}`
#[derive(Debug, Clone)]
pub struct MapBoxVectorUrl {
    tilesets: String,
    access_token: String,
}

impl MapBoxVectorUrl {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            tilesets: DEFAULT_MAPBOX_TILESETS.to_string(),
            access_token: access_token.into(),
        }
    }

    /// Comma-separated tileset ids to composite.
    pub fn with_tilesets(mut self, tilesets: impl Into<String>) -> Self {
        self.tilesets = tilesets.into();
        self
    }
}

impl TileUrlBuilder for MapBoxVectorUrl {
    fn url(&self, id: TileId) -> String {
        format!(
            "{}/{}/{}/{}/{}.mvt?access_token={}",
            MAPBOX_BASE_URL, self.tilesets, id.z, id.x, id.y, self.access_token
        )
    }

    fn name(&self) -> &str {
        "MapBox"
    }

    fn max_zoom(&self) -> u8 {
        MAPBOX_MAX_ZOOM
    }
}

/// URL template with `{z}`, `{x}` and `{y}` placeholders.
///
/// Works with any XYZ tile server, e.g.
/// `https://tiles.example.com/{z}/{x}/{y}.mvt`.
#[derive(Debug, Clone)]
pub struct TemplateUrl {
    template: String,
    max_zoom: u8,
}

impl TemplateUrl {
    /// Validates that the template carries all three placeholders.
    pub fn new(template: impl Into<String>, max_zoom: u8) -> Result<Self, ProviderError> {
        let template = template.into();
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !template.contains(placeholder) {
                return Err(ProviderError::InvalidConfig(format!(
                    "URL template '{}' is missing {}",
                    template, placeholder
                )));
            }
        }
        Ok(Self { template, max_zoom })
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl TileUrlBuilder for TemplateUrl {
    fn url(&self, id: TileId) -> String {
        self.template
            .replace("{z}", &id.z.to_string())
            .replace("{x}", &id.x.to_string())
            .replace("{y}", &id.y.to_string())
    }

    fn name(&self) -> &str {
        "template"
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }
}
