//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.
//! Missing sections and keys keep their defaults; empty values for optional
//! keys mean "unset".

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::defaults::{PROVIDER_TYPES, STYLE_NAMES};
use super::duration::parse_duration;
use super::file::ConfigError;
use super::settings::ConfigFile;
use super::size::parse_size;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigError> {
    let mut config = ConfigFile::default();

    // [provider] section
    if let Some(section) = ini.section(Some("provider")) {
        let reader = SectionReader::new("provider", section);
        if let Some(v) = reader.get("type") {
            let v = v.to_lowercase();
            if !PROVIDER_TYPES.contains(&v.as_str()) {
                return Err(reader.invalid("type", &v, "must be one of: mapbox, template"));
            }
            config.provider.provider_type = v;
        }
        if let Some(v) = reader.optional("access_token") {
            config.provider.access_token = v;
        }
        if let Some(v) = reader.optional("tilesets") {
            config.provider.tilesets = v;
        }
        if let Some(v) = reader.optional("url_template") {
            config.provider.url_template = v;
        }
        if let Some(v) = reader.duration("timeout")? {
            config.provider.timeout = v;
        }
        if let Some(v) = reader.get("user_agent") {
            if !v.is_empty() {
                config.provider.user_agent = v.to_string();
            }
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        let reader = SectionReader::new("cache", section);
        if let Some(v) = reader.get("directory") {
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
        if let Some(v) = reader.duration("disk_ttl")? {
            config.cache.disk_ttl = v;
        }
        if let Some(v) = reader.get("memory_budget") {
            config.cache.memory_budget = parse_size(v).map_err(|_| {
                reader.invalid("memory_budget", v, "expected format like '256MB' or '1GB'")
            })?;
        }
        if let Some(v) = reader.parse::<bool>("clear_on_start", "must be 'true' or 'false'")? {
            config.cache.clear_on_start = v;
        }
    }

    // [fetch] section
    if let Some(section) = ini.section(Some("fetch")) {
        let reader = SectionReader::new("fetch", section);
        if let Some(v) = reader.parse("max_concurrent", "must be a positive integer")? {
            config.fetch.max_concurrent = v;
        }
        if let Some(v) = reader.parse("queue_capacity", "must be a positive integer")? {
            config.fetch.queue_capacity = v;
        }
        if let Some(v) = reader.duration("failure_cooldown")? {
            config.fetch.failure_cooldown = v;
        }
    }

    // [view] section
    if let Some(section) = ini.section(Some("view")) {
        let reader = SectionReader::new("view", section);
        if let Some(v) = reader.parse("tiles_in_direction", "must be a non-negative integer")? {
            config.view.tiles_in_direction = v;
        }
        if let Some(v) = reader.parse("max_tile_zoom", "must be an integer between 0 and 22")? {
            config.view.max_tile_zoom = v;
        }
        if let Some(v) = reader.parse::<f32>("map_size", "must be a positive number")? {
            if !(v.is_finite() && v > 0.0) {
                return Err(reader.invalid("map_size", &v.to_string(), "must be a positive number"));
            }
            config.view.map_size = v;
        }
    }

    // [decode] section
    if let Some(section) = ini.section(Some("decode")) {
        let reader = SectionReader::new("decode", section);
        if let Some(v) = reader.duration("debounce")? {
            config.decode.debounce = v;
        }
        if let Some(v) = reader.get("style") {
            let v = v.to_lowercase();
            if !STYLE_NAMES.contains(&v.as_str()) {
                return Err(reader.invalid("style", &v, "must be one of: default, night"));
            }
            config.decode.style = v;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        let reader = SectionReader::new("logging", section);
        if let Some(v) = reader.get("directory") {
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = reader.get("file") {
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

/// Typed access to one INI section with uniform error reporting.
struct SectionReader<'a> {
    name: &'static str,
    section: &'a Properties,
}

impl<'a> SectionReader<'a> {
    fn new(name: &'static str, section: &'a Properties) -> Self {
        Self { name, section }
    }

    /// Trimmed value of `key`, if present.
    fn get(&self, key: &str) -> Option<&'a str> {
        self.section.get(key).map(str::trim)
    }

    /// `Some(None)` for an explicitly empty value.
    fn optional(&self, key: &str) -> Option<Option<String>> {
        self.get(key)
            .map(|v| (!v.is_empty()).then(|| v.to_string()))
    }

    fn parse<T: FromStr>(&self, key: &str, reason: &str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(key, v, reason)),
            None => Ok(None),
        }
    }

    fn duration(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
        match self.get(key) {
            Some(v) => parse_duration(v).map(Some).map_err(|_| {
                self.invalid(key, v, "expected format like '500ms', '30s', '12h', or '7d'")
            }),
            None => Ok(None),
        }
    }

    fn invalid(&self, key: &str, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Expands a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<ConfigFile, ConfigError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_full_file() {
        let config = parse(
            r#"
[provider]
type = template
url_template = https://tiles.example.com/{z}/{x}/{y}.mvt
timeout = 10s

[cache]
directory = /tmp/tiles
disk_ttl = 2d
memory_budget = 64MB
clear_on_start = true

[fetch]
max_concurrent = 4
queue_capacity = 32
failure_cooldown = 30s

[view]
tiles_in_direction = 2
max_tile_zoom = 14
map_size = 2000

[decode]
debounce = 250ms
style = night

[logging]
directory = /tmp/logs
file = engine.log
"#,
        )
        .unwrap();

        assert_eq!(config.provider.provider_type, "template");
        assert_eq!(
            config.provider.url_template.as_deref(),
            Some("https://tiles.example.com/{z}/{x}/{y}.mvt")
        );
        assert_eq!(config.provider.timeout, Duration::from_secs(10));
        assert_eq!(config.cache.directory, PathBuf::from("/tmp/tiles"));
        assert_eq!(config.cache.disk_ttl, Duration::from_secs(2 * 86_400));
        assert_eq!(config.cache.memory_budget, 64 * 1024 * 1024);
        assert!(config.cache.clear_on_start);
        assert_eq!(config.fetch.max_concurrent, 4);
        assert_eq!(config.fetch.queue_capacity, 32);
        assert_eq!(config.fetch.failure_cooldown, Duration::from_secs(30));
        assert_eq!(config.view.tiles_in_direction, 2);
        assert_eq!(config.view.max_tile_zoom, 14);
        assert_eq!(config.view.map_size, 2000.0);
        assert_eq!(config.decode.debounce, Duration::from_millis(250));
        assert_eq!(config.decode.style, "night");
        assert_eq!(config.logging.file, "engine.log");
    }

    #[test]
    fn test_empty_token_is_unset() {
        let config = parse("[provider]\naccess_token =\n").unwrap();
        assert!(config.provider.access_token.is_none());
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let err = parse("[fetch]\nmax_concurrent = many\n").unwrap_err();
        match err {
            ConfigError::InvalidValue {
                section, key, value, ..
            } => {
                assert_eq!(section, "fetch");
                assert_eq!(key, "max_concurrent");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(parse("[provider]\ntype = bing\n").is_err());
        assert!(parse("[cache]\ndisk_ttl = forever\n").is_err());
        assert!(parse("[cache]\nmemory_budget = lots\n").is_err());
        assert!(parse("[view]\nmap_size = -5\n").is_err());
        assert!(parse("[decode]\nstyle = neon\n").is_err());
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/tiles"), home.join("tiles"));
        }
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }
}
