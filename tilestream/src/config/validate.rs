//! Startup checks and conversion into component configs.
//!
//! The overflow queue must hold at least one screen of tiles, otherwise a
//! full-screen burst of cache misses silently loses requests. That and the
//! other cross-setting rules are checked here, once, before the engine
//! starts.

use super::file::ConfigError;
use super::settings::ConfigFile;
use crate::cache::{DiskCacheConfig, MemoryCacheConfig};
use crate::coord::MAX_ZOOM;
use crate::decode::{style_by_name, MapStyle};
use crate::pipeline::AdmissionConfig;
use crate::provider::{HttpClientConfig, ProviderConfig};
use crate::tile::MapPlacement;
use crate::visible::{visible_tile_count, VisibleTileGrid};

impl ConfigFile {
    /// Number of tiles on screen at once.
    pub fn visible_tile_count(&self) -> usize {
        visible_tile_count(self.view.tiles_in_direction)
    }

    /// Checks every cross-setting invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "fetch.max_concurrent must be at least 1".to_string(),
            ));
        }

        let visible = self.visible_tile_count();
        if self.fetch.queue_capacity < visible {
            return Err(ConfigError::Invalid(format!(
                "fetch.queue_capacity ({}) is smaller than the visible tile count ({}) for \
                 view.tiles_in_direction = {}",
                self.fetch.queue_capacity, visible, self.view.tiles_in_direction
            )));
        }

        if self.cache.memory_budget == 0 {
            return Err(ConfigError::Invalid(
                "cache.memory_budget must be greater than zero".to_string(),
            ));
        }

        if self.decode.debounce.is_zero() {
            return Err(ConfigError::Invalid(
                "decode.debounce must be greater than zero".to_string(),
            ));
        }

        if self.view.max_tile_zoom > MAX_ZOOM {
            return Err(ConfigError::Invalid(format!(
                "view.max_tile_zoom ({}) exceeds the maximum zoom {}",
                self.view.max_tile_zoom, MAX_ZOOM
            )));
        }

        if style_by_name(&self.decode.style).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown decode.style '{}'",
                self.decode.style
            )));
        }

        self.provider_config()?
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Tile source described by `[provider]`.
    pub fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        let provider = &self.provider;
        match provider.provider_type.as_str() {
            "mapbox" => Ok(ProviderConfig::MapBox {
                access_token: provider.access_token.clone().unwrap_or_default(),
                tilesets: provider.tilesets.clone(),
            }),
            "template" => {
                let url = provider.url_template.clone().ok_or_else(|| {
                    ConfigError::Invalid(
                        "provider.url_template is required when type = template".to_string(),
                    )
                })?;
                Ok(ProviderConfig::template(url, self.view.max_tile_zoom))
            }
            other => Err(ConfigError::InvalidValue {
                section: "provider".to_string(),
                key: "type".to_string(),
                value: other.to_string(),
                reason: "must be one of: mapbox, template".to_string(),
            }),
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: self.provider.timeout,
            user_agent: self.provider.user_agent.clone(),
        }
    }

    pub fn disk_cache_config(&self) -> DiskCacheConfig {
        DiskCacheConfig::new(&self.cache.directory)
            .with_ttl(self.cache.disk_ttl)
            .with_clear_on_start(self.cache.clear_on_start)
    }

    pub fn memory_cache_config(&self) -> MemoryCacheConfig {
        MemoryCacheConfig::new(self.cache.memory_budget)
    }

    pub fn admission_config(&self) -> AdmissionConfig {
        AdmissionConfig {
            max_concurrent: self.fetch.max_concurrent,
            queue_capacity: self.fetch.queue_capacity,
            failure_cooldown: (!self.fetch.failure_cooldown.is_zero())
                .then_some(self.fetch.failure_cooldown),
        }
    }

    pub fn visible_grid(&self) -> VisibleTileGrid {
        VisibleTileGrid::new(self.view.tiles_in_direction, self.view.max_tile_zoom)
    }

    pub fn placement(&self) -> MapPlacement {
        MapPlacement::new(self.view.map_size)
    }

    /// Configured map style, falling back to the default style.
    pub fn map_style(&self) -> Box<dyn MapStyle> {
        style_by_name(&self.decode.style)
            .unwrap_or_else(|| Box::new(crate::decode::DefaultMapStyle::new()))
    }
}
