//! Engine error types.

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::provider::ProviderError;
use thiserror::Error;

/// Errors raised while starting or operating the engine.
///
/// Tile-level failures never surface here; they degrade to a missing tile.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// No Tokio runtime available for background work
    #[error("Runtime error: {0}")]
    Runtime(String),
}
