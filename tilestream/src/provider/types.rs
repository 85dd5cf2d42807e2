//! Provider types and traits

use crate::coord::TileId;
use bytes::Bytes;
use std::fmt;
use std::future::Future;

/// Errors that can occur while fetching tiles.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Transport-level failure (connect, TLS, timeout, body read)
    HttpError(String),
    /// Server answered with a non-success status
    UnexpectedStatus { status: u16, url: String },
    /// Server answered successfully with an empty body
    EmptyResponse(TileId),
    /// Zoom level not supported by this provider
    UnsupportedZoom(u8),
    /// Provider settings are incomplete or malformed
    InvalidConfig(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            ProviderError::UnexpectedStatus { status, url } => {
                write!(f, "HTTP {} from {}", status, url)
            }
            ProviderError::EmptyResponse(tile) => {
                write!(f, "Empty response for tile {}", tile)
            }
            ProviderError::UnsupportedZoom(zoom) => {
                write!(f, "Zoom level {} not supported by provider", zoom)
            }
            ProviderError::InvalidConfig(msg) => {
                write!(f, "Invalid provider configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// Downloads one tile.
///
/// The admission controller calls this after a disk cache miss. A failure is
/// reported once and never retried here; the tile is requested again on a
/// later visibility pass.
pub trait TileFetcher: Send + Sync {
    /// Fetches the raw bytes of a tile.
    fn fetch(&self, id: TileId) -> impl Future<Output = Result<Bytes, ProviderError>> + Send;

    /// Returns the provider's name for logging and identification.
    fn name(&self) -> &str;

    /// Returns the minimum supported zoom level.
    fn min_zoom(&self) -> u8 {
        0
    }

    /// Returns the maximum supported zoom level.
    fn max_zoom(&self) -> u8;

    /// Checks if this provider supports the given zoom level.
    fn supports_zoom(&self, zoom: u8) -> bool {
        zoom >= self.min_zoom() && zoom <= self.max_zoom()
    }
}
