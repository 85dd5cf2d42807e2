//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented INI representation written to `config.ini`.
//! Comments sit on their own lines; the parser does not strip inline ones.

use std::path::Path;

use super::duration::format_duration;
use super::settings::ConfigFile;
use super::size::format_size;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let access_token = config.provider.access_token.as_deref().unwrap_or("");
    let tilesets = config.provider.tilesets.as_deref().unwrap_or("");
    let url_template = config.provider.url_template.as_deref().unwrap_or("");

    format!(
        r#"[provider]
; Tile source:
;   mapbox   - MapBox vector tiles (requires access_token)
;   template - any XYZ server (requires url_template)
type = {provider_type}
; MapBox access token (only required when type = mapbox)
; Get one at: https://account.mapbox.com/
access_token = {access_token}
; Comma-separated MapBox tilesets (empty = streets + terrain)
tilesets = {tilesets}
; URL with {{z}}, {{x}} and {{y}} placeholders (only required when type = template)
; Example: https://tiles.example.com/{{z}}/{{x}}/{{y}}.mvt
url_template = {url_template}
; HTTP request timeout (default: 30s)
timeout = {timeout}
user_agent = {user_agent}

[cache]
; Directory for downloaded tiles, one file per tile
; If empty, defaults to the platform cache directory
directory = {cache_dir}
; Age after which a downloaded tile is fetched again (default: 7d)
disk_ttl = {disk_ttl}
; Device memory budget for decoded tiles (default: 256MB)
; Supports: KB, MB, GB suffixes
memory_budget = {memory_budget}
; Delete every downloaded tile on startup
clear_on_start = {clear_on_start}

[fetch]
; Maximum concurrent tile fetches (default: 10)
max_concurrent = {max_concurrent}
; Tiles waiting for a fetch slot (default: 64)
; Must be at least the visible tile count, (2 * tiles_in_direction + 1)^2
queue_capacity = {queue_capacity}
; Refuse to refetch a failed tile for this long (default: 0s = disabled)
failure_cooldown = {failure_cooldown}

[view]
; Tiles loaded in each direction around the camera (default: 1)
tiles_in_direction = {tiles_in_direction}
; Deepest zoom requested from the provider (default: 16)
max_tile_zoom = {max_tile_zoom}
; Side length of the world map in world units (default: 1000)
map_size = {map_size}

[decode]
; Quiet period before downloaded tiles are decoded in one batch (default: 500ms)
debounce = {debounce}
; Map style: default or night
style = {style}

[logging]
; Log directory (default: platform cache directory)
directory = {log_dir}
file = {log_file}
"#,
        provider_type = config.provider.provider_type,
        timeout = format_duration(config.provider.timeout),
        user_agent = config.provider.user_agent,
        cache_dir = path_to_string(&config.cache.directory),
        disk_ttl = format_duration(config.cache.disk_ttl),
        memory_budget = format_size(config.cache.memory_budget),
        clear_on_start = config.cache.clear_on_start,
        max_concurrent = config.fetch.max_concurrent,
        queue_capacity = config.fetch.queue_capacity,
        failure_cooldown = format_duration(config.fetch.failure_cooldown),
        tiles_in_direction = config.view.tiles_in_direction,
        max_tile_zoom = config.view.max_tile_zoom,
        map_size = config.view.map_size,
        debounce = format_duration(config.decode.debounce),
        style = config.decode.style,
        log_dir = path_to_string(&config.logging.directory),
        log_file = config.logging.file,
    )
}

/// Writes paths under the home directory as `~/...`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
