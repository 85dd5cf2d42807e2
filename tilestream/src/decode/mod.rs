//! Tile decoding contract.
//!
//! Turning vector-tile bytes into geometry is delegated to a [`TileDecoder`].
//! The engine only relies on the output shape, [`ParsedTile`], whose vertex
//! and style records are `bytemuck::Pod` so they upload to the graphics
//! device without copying field by field.
//!
//! Styling is injected through the [`MapStyle`] capability so the same
//! decoder can serve any look.

pub mod style;

pub use style::{
    style_by_name, BaseColors, DefaultMapStyle, FeatureInfo, FeatureStyle, MapStyle, NightMapStyle,
};

use crate::coord::TileId;
use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// One polygon vertex in tile-local coordinates (`[-1, 1]²`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PolygonVertex {
    pub position: [f32; 2],
    /// Index into [`ParsedTile::styles`].
    pub style_index: u32,
}

/// Style record uploaded alongside the geometry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct StyleUniform {
    pub color: [f32; 4],
}

impl From<FeatureStyle> for StyleUniform {
    fn from(style: FeatureStyle) -> Self {
        Self { color: style.color }
    }
}

/// A label anchored in tile-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLabel {
    pub text: String,
    pub position: [f32; 2],
}

/// Decoder output: triangulated geometry plus style metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTile {
    pub vertices: Vec<PolygonVertex>,
    pub indices: Vec<u32>,
    pub styles: Vec<StyleUniform>,
    pub labels: Vec<TileLabel>,
}

impl ParsedTile {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Errors raised while decoding tile bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed tile data: {0}")]
    Malformed(String),

    #[error("tile contains no data")]
    Empty,
}

/// Parses raw tile bytes into renderable geometry.
///
/// Called from the upload stage's worker thread, so implementations must be
/// `Send + Sync`. Closures with the same signature implement the trait.
pub trait TileDecoder: Send + Sync {
    fn decode(
        &self,
        id: TileId,
        bytes: &[u8],
        style: &dyn MapStyle,
    ) -> Result<ParsedTile, DecodeError>;
}

impl<F> TileDecoder for F
where
    F: Fn(TileId, &[u8], &dyn MapStyle) -> Result<ParsedTile, DecodeError> + Send + Sync,
{
    fn decode(
        &self,
        id: TileId,
        bytes: &[u8],
        style: &dyn MapStyle,
    ) -> Result<ParsedTile, DecodeError> {
        self(id, bytes, style)
    }
}
