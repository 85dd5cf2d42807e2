//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;
use std::time::Duration;

/// Complete engine configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Tile source settings
    pub provider: ProviderSettings,
    /// Disk and decoded cache settings
    pub cache: CacheSettings,
    /// Fetch admission settings
    pub fetch: FetchSettings,
    /// Visible tile grid and world placement
    pub view: ViewSettings,
    /// Decode/upload stage settings
    pub decode: DecodeSettings,
    /// Log output settings
    pub logging: LoggingSettings,
}

/// Provider configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    /// Provider type: "mapbox" or "template"
    pub provider_type: String,
    /// MapBox access token (required for "mapbox")
    pub access_token: Option<String>,
    /// MapBox tilesets to composite; `None` uses the built-in default
    pub tilesets: Option<String>,
    /// URL with `{z}`, `{x}` and `{y}` placeholders (required for "template")
    pub url_template: Option<String>,
    /// HTTP request timeout
    pub timeout: Duration,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Disk cache directory
    pub directory: PathBuf,
    /// Age after which disk entries are treated as absent
    pub disk_ttl: Duration,
    /// Decoded-tile byte budget
    pub memory_budget: u64,
    /// Purge the disk cache when the engine starts
    pub clear_on_start: bool,
}

/// Fetch admission configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    /// Ceiling on concurrent fetches
    pub max_concurrent: usize,
    /// Overflow queue capacity; must cover the visible tile count
    pub queue_capacity: usize,
    /// Cooldown after a failed fetch; zero disables it
    pub failure_cooldown: Duration,
}

/// Visible tile grid configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    /// Grid radius in tiles around the camera
    pub tiles_in_direction: u32,
    /// Deepest zoom requested from the provider
    pub max_tile_zoom: u8,
    /// Side length of the world map in world units
    pub map_size: f32,
}

/// Decode/upload configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeSettings {
    /// Quiet period before a batch is flushed
    pub debounce: Duration,
    /// Built-in map style name: "default" or "night"
    pub style: String,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Directory holding the log file
    pub directory: PathBuf,
    /// Log file name
    pub file: String,
}
