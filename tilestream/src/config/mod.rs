//! Engine configuration.
//!
//! Settings live in an INI file at `~/.tilestream/config.ini`, one section
//! per concern. Missing keys fall back to the defaults owned by each
//! component, so an empty file is a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use tilestream::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! config.validate()?;
//! println!("{} tiles on screen", config.visible_tile_count());
//! # Ok::<(), tilestream::config::ConfigError>(())
//! ```

mod defaults;
mod duration;
mod file;
mod parser;
mod settings;
mod size;
mod validate;
mod writer;

pub use defaults::{
    DEFAULT_FAILURE_COOLDOWN, DEFAULT_PROVIDER_TYPE, DEFAULT_STYLE, PROVIDER_TYPES, STYLE_NAMES,
};
pub use duration::{format_duration, parse_duration, DurationParseError};
pub use file::{config_directory, config_file_path, ensure_config_dir, ConfigError};
pub use settings::{
    CacheSettings, ConfigFile, DecodeSettings, FetchSettings, LoggingSettings, ProviderSettings,
    ViewSettings,
};
pub use size::{format_size, format_size_approx, parse_size, SizeParseError};
