//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and one exit code per failure class.

use std::fmt;
use std::path::PathBuf;
use std::process;

use tilestream::cache::CacheError;
use tilestream::config::ConfigError;
use tilestream::coord::CoordError;
use tilestream::engine::EngineError;
use tilestream::provider::ProviderError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be read, written or validated
    Config(ConfigError),
    /// Engine failed to start
    Engine(EngineError),
    /// Disk cache operation failed
    Cache(CacheError),
    /// Tile download failed
    Provider(ProviderError),
    /// Tile coordinates rejected
    Coord(CoordError),
    /// Filesystem error outside the cache
    Io { path: PathBuf, error: std::io::Error },
    /// Runtime or logging setup failed
    Runtime(String),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// Codes 1 and 2 are left to panics and clap usage errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 3,
            CliError::Engine(_) => 4,
            CliError::Cache(_) => 5,
            CliError::Provider(_) => 6,
            CliError::Coord(_) => 7,
            CliError::Io { .. } => 8,
            CliError::Runtime(_) => 9,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigError::Invalid(_)) => {
                eprintln!();
                eprintln!("Check your configuration with: tilestream config show");
            }
            CliError::Provider(ProviderError::UnexpectedStatus { status: 401, .. }) => {
                eprintln!();
                eprintln!("The provider rejected the request. Make sure:");
                eprintln!("  1. access_token in [provider] is set");
                eprintln!("  2. The token has not been revoked");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Engine(e) => write!(f, "Engine error: {}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::Provider(e) => write!(f, "Download failed: {}", e),
            CliError::Coord(e) => write!(f, "Invalid tile: {}", e),
            CliError::Io { path, error } => {
                write!(f, "Failed to access '{}': {}", path.display(), error)
            }
            CliError::Runtime(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Engine(e) => Some(e),
            CliError::Cache(e) => Some(e),
            CliError::Provider(e) => Some(e),
            CliError::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        CliError::Engine(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Provider(e)
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::Coord(e)
    }
}
