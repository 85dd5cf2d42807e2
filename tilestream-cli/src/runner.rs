//! CLI runner for common setup and operations.
//!
//! Encapsulates configuration loading, logging initialization and the
//! component construction shared by command handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use tilestream::cache::DiskCache;
use tilestream::config::{config_file_path, ConfigFile};
use tilestream::logging::{init_logging, LoggingGuard};
use tilestream::provider::{HttpTileFetcher, ReqwestClient};

use crate::error::CliError;

/// Loads the configuration file named by `--config`, or the default one.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = resolve_config_path(path);
    Ok(ConfigFile::load_from(&path)?)
}

/// Path of the configuration file in use.
pub fn resolve_config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(config_file_path)
}

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Loads the configuration and initializes logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Configuration file override, `None` for the default
    /// * `debug_mode` - When true, logs at debug level unless RUST_LOG is set
    pub fn new(config_path: Option<&Path>, debug_mode: bool) -> Result<Self, CliError> {
        let config = load_config(config_path)?;

        let level = if debug_mode { "debug" } else { "info" };
        let logging_guard = init_logging(&config.logging.directory, &config.logging.file, level)
            .map_err(|e| CliError::Runtime(format!("Failed to initialize logging: {}", e)))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("tilestream v{}", tilestream::VERSION);
        info!("tilestream CLI: {} command", command);
    }

    /// Opens the disk cache without applying `clear_on_start`.
    pub async fn open_disk_cache(&self) -> Result<Arc<DiskCache>, CliError> {
        let config = self.config.disk_cache_config().with_clear_on_start(false);
        Ok(Arc::new(DiskCache::open(config).await?))
    }

    /// Builds the fetcher for the configured provider.
    pub fn create_fetcher(&self) -> Result<HttpTileFetcher<ReqwestClient>, CliError> {
        let provider = self.config.provider_config()?;
        provider.validate()?;
        let fetcher = provider.build_fetcher(&self.config.http_client_config())?;
        info!(provider = provider.kind(), "Provider ready");
        Ok(fetcher)
    }
}
