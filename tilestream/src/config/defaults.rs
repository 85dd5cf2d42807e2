//! Default values and constants for all configuration settings.
//!
//! Component defaults are owned by the components themselves; this module
//! gathers them for the config file and holds `ConfigFile::default()`.

use std::time::Duration;

use super::settings::*;
use crate::cache::{default_tile_directory, DEFAULT_DISK_TTL, DEFAULT_MEMORY_BUDGET};
use crate::logging::{default_log_dir, DEFAULT_LOG_FILE};
use crate::pipeline::{DEFAULT_DEBOUNCE_INTERVAL, DEFAULT_MAX_CONCURRENT, DEFAULT_QUEUE_CAPACITY};
use crate::provider::{DEFAULT_HTTP_TIMEOUT, DEFAULT_USER_AGENT};
use crate::tile::DEFAULT_MAP_SIZE;
use crate::visible::{DEFAULT_MAX_TILE_ZOOM, DEFAULT_TILES_IN_DIRECTION};

/// Default provider type.
pub const DEFAULT_PROVIDER_TYPE: &str = "mapbox";

/// Provider types understood by the config file.
pub const PROVIDER_TYPES: [&str; 2] = ["mapbox", "template"];

/// Default map style.
pub const DEFAULT_STYLE: &str = "default";

/// Map styles understood by the config file.
pub const STYLE_NAMES: [&str; 2] = ["default", "night"];

/// Failure cooldown; zero disables it.
pub const DEFAULT_FAILURE_COOLDOWN: Duration = Duration::ZERO;

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            provider: ProviderSettings {
                provider_type: DEFAULT_PROVIDER_TYPE.to_string(),
                access_token: None,
                tilesets: None,
                url_template: None,
                timeout: DEFAULT_HTTP_TIMEOUT,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            cache: CacheSettings {
                directory: default_tile_directory(),
                disk_ttl: DEFAULT_DISK_TTL,
                memory_budget: DEFAULT_MEMORY_BUDGET,
                clear_on_start: false,
            },
            fetch: FetchSettings {
                max_concurrent: DEFAULT_MAX_CONCURRENT,
                queue_capacity: DEFAULT_QUEUE_CAPACITY,
                failure_cooldown: DEFAULT_FAILURE_COOLDOWN,
            },
            view: ViewSettings {
                tiles_in_direction: DEFAULT_TILES_IN_DIRECTION,
                max_tile_zoom: DEFAULT_MAX_TILE_ZOOM,
                map_size: DEFAULT_MAP_SIZE,
            },
            decode: DecodeSettings {
                debounce: DEFAULT_DEBOUNCE_INTERVAL,
                style: DEFAULT_STYLE.to_string(),
            },
            logging: LoggingSettings {
                directory: default_log_dir(),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
