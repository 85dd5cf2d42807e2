//! Map styles.
//!
//! A [`MapStyle`] decides how decoded features look: polygon colours per
//! layer, the base colours painted under and around the tiles, and which
//! features get text labels.

use crate::coord::TileId;
use glam::Vec4;

/// Feature attributes a style decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureInfo<'a> {
    /// Vector tile layer name, e.g. `water`.
    pub layer: &'a str,
    /// Feature class within the layer, if any.
    pub class: Option<&'a str>,
    /// Display name, if any.
    pub name: Option<&'a str>,
}

impl<'a> FeatureInfo<'a> {
    pub fn layer(layer: &'a str) -> Self {
        Self {
            layer,
            class: None,
            name: None,
        }
    }
}

/// Resolved style for one feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStyle {
    /// Stable key shared by every feature with this style.
    pub key: u8,
    pub color: [f32; 4],
}

/// Colours painted outside of feature geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseColors {
    pub tile_background: Vec4,
    pub background: Vec4,
    pub water: Vec4,
    pub land_cover: Vec4,
    pub north_pole: Vec4,
    pub south_pole: Vec4,
}

impl BaseColors {
    /// Derives the pole caps: water colour in the north, land cover blended
    /// over the tile background in the south.
    pub fn new(tile_background: Vec4, background: Vec4, water: Vec4, land_cover: Vec4) -> Self {
        Self {
            tile_background,
            background,
            water,
            land_cover,
            north_pole: water,
            south_pole: blend(land_cover, tile_background),
        }
    }
}

impl Default for BaseColors {
    fn default() -> Self {
        Self::new(
            Vec4::new(1.0, 1.0, 1.0, 1.0),
            Vec4::new(0.0039, 0.0431, 0.0980, 1.0),
            Vec4::new(0.3, 0.6, 0.9, 1.0),
            Vec4::new(0.4, 0.7, 0.4, 0.7),
        )
    }
}

/// Source-over alpha blend.
pub fn blend(source: Vec4, destination: Vec4) -> Vec4 {
    let alpha = source.w;
    let rgb = source.truncate() * alpha + destination.truncate() * (1.0 - alpha);
    rgb.extend(alpha * alpha + destination.w * (1.0 - alpha))
}

/// Styling capability injected into decoding.
pub trait MapStyle: Send + Sync {
    /// Style name for logging and configuration.
    fn name(&self) -> &str;

    fn base_colors(&self) -> BaseColors;

    /// Style for a polygon feature. Unknown layers get a fallback style.
    fn feature_style(&self, feature: &FeatureInfo<'_>) -> FeatureStyle;

    /// Label text for a feature, or `None` to leave it unlabelled.
    fn label(&self, feature: &FeatureInfo<'_>, tile: TileId) -> Option<String>;
}

const FALLBACK_KEY: u8 = 0;
const LAND_COVER_KEY: u8 = 1;
const WATER_KEY: u8 = 200;

/// Layer-to-key mapping shared by the built-in styles.
fn style_key(layer: &str) -> u8 {
    match layer {
        "water" => WATER_KEY,
        "landcover" => LAND_COVER_KEY,
        _ => FALLBACK_KEY,
    }
}

/// Place names from zoom 4 up; road names from zoom 12 up.
fn default_label(feature: &FeatureInfo<'_>, tile: TileId) -> Option<String> {
    let name = feature.name?;
    let min_zoom = match feature.layer {
        "place_label" => 4,
        "road" => 12,
        _ => return None,
    };
    (tile.z >= min_zoom).then(|| name.to_string())
}

/// Daytime style: blue water, translucent green land cover.
#[derive(Debug, Clone, Default)]
pub struct DefaultMapStyle {
    colors: BaseColors,
}

impl DefaultMapStyle {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MapStyle for DefaultMapStyle {
    fn name(&self) -> &str {
        "default"
    }

    fn base_colors(&self) -> BaseColors {
        self.colors
    }

    fn feature_style(&self, feature: &FeatureInfo<'_>) -> FeatureStyle {
        let key = style_key(feature.layer);
        let color = match key {
            WATER_KEY => [0.0, 0.0, 1.0, 1.0],
            LAND_COVER_KEY => [0.5, 1.0, 0.5, 0.5],
            _ => [1.0, 0.0, 0.0, 1.0],
        };
        FeatureStyle { key, color }
    }

    fn label(&self, feature: &FeatureInfo<'_>, tile: TileId) -> Option<String> {
        default_label(feature, tile)
    }
}

/// Dark style for night-time display.
#[derive(Debug, Clone)]
pub struct NightMapStyle {
    colors: BaseColors,
}

impl Default for NightMapStyle {
    fn default() -> Self {
        Self {
            colors: BaseColors::new(
                Vec4::new(0.08, 0.09, 0.12, 1.0),
                Vec4::new(0.0, 0.0, 0.02, 1.0),
                Vec4::new(0.05, 0.12, 0.25, 1.0),
                Vec4::new(0.1, 0.2, 0.12, 0.8),
            ),
        }
    }
}

impl NightMapStyle {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MapStyle for NightMapStyle {
    fn name(&self) -> &str {
        "night"
    }

    fn base_colors(&self) -> BaseColors {
        self.colors
    }

    fn feature_style(&self, feature: &FeatureInfo<'_>) -> FeatureStyle {
        let key = style_key(feature.layer);
        let color = match key {
            WATER_KEY => self.colors.water.to_array(),
            LAND_COVER_KEY => self.colors.land_cover.to_array(),
            _ => [0.35, 0.35, 0.4, 1.0],
        };
        FeatureStyle { key, color }
    }

    fn label(&self, feature: &FeatureInfo<'_>, tile: TileId) -> Option<String> {
        // Roads are unreadable on the dark palette; keep only places.
        if feature.layer == "road" {
            return None;
        }
        default_label(feature, tile)
    }
}

/// Looks up a built-in style by name.
pub fn style_by_name(name: &str) -> Option<Box<dyn MapStyle>> {
    match name {
        "default" => Some(Box::new(DefaultMapStyle::new())),
        "night" => Some(Box::new(NightMapStyle::new())),
        _ => None,
    }
}
