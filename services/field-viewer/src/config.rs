//! Viewer configuration loaded from a YAML file.
//!
//! Every section is optional; omitted sections fall back to defaults that
//! match the library constants.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use field_common::{BoundingBox, FeatureRecord, FieldResult, Viewport};
use playback::{FrameQuery, PlaybackConfig};
use renderer::{ColorMapper, Palette, PaletteKind, ScaleMode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    /// Backend query endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Decimal places kept when decoding packed arrays
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    #[serde(default)]
    pub field: FieldConfig,
    #[serde(default)]
    pub vectors: Option<VectorConfig>,
    #[serde(default)]
    pub playback: PlaybackSettings,
    #[serde(default)]
    pub palettes: PaletteOverrides,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub profile: Option<ProfileConfig>,
}

fn default_endpoint() -> String {
    "http://localhost:8000/query".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_decimals() -> u32 {
    field_common::codec::DEFAULT_DECODE_DECIMALS
}

/// The scalar field to display.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    /// Legend title
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub palette: PaletteKind,
    /// Overrides the palette's default scale
    #[serde(default)]
    pub scale: Option<ScaleMode>,
    #[serde(default)]
    pub swap: bool,
    /// Extra parameters sent with the snapshot and frame queries
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default = "default_legend_ticks")]
    pub legend_ticks: usize,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            palette: PaletteKind::default(),
            scale: None,
            swap: false,
            params: Map::new(),
            legend_ticks: default_legend_ticks(),
        }
    }
}

fn default_title() -> String {
    "Value".to_string()
}

fn default_legend_ticks() -> usize {
    5
}

/// Optional vector field drawn as arrows.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorConfig {
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Pixels per unit of velocity
    #[serde(default = "default_vector_scale")]
    pub scale: f64,
}

fn default_vector_scale() -> f64 {
    field_layers::engine::DEFAULT_VECTOR_SCALE
}

/// Debounce and frame timing.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_frame_period_ms")]
    pub frame_period_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            frame_period_ms: default_frame_period_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    playback::DEFAULT_DEBOUNCE.as_millis() as u64
}

fn default_frame_period_ms() -> u64 {
    playback::DEFAULT_FRAME_PERIOD.as_millis() as u64
}

/// Custom palettes as lists of `#rrggbb` colors, evenly spaced.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaletteOverrides {
    #[serde(default)]
    pub scalar: Option<Vec<String>>,
    #[serde(default)]
    pub vector: Option<Vec<String>>,
}

/// Output raster size and map extent.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// `[min_lon, min_lat, max_lon, max_lat]`; defaults to the features' extent
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            bbox: None,
        }
    }
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

/// Path for the profile chart, as `[lon, lat]` vertices.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileConfig {
    pub path: Vec<[f64; 2]>,
    #[serde(default = "default_spacing_m")]
    pub spacing_m: f64,
}

fn default_spacing_m() -> f64 {
    100.0
}

impl ViewerConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ViewerConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // Fail early on bad palettes rather than at first render
        config.scalar_mapper()?;
        config.vector_mapper()?;

        info!(path = %path.display(), endpoint = %config.endpoint, "Loaded viewer config");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scalar_mapper(&self) -> FieldResult<ColorMapper> {
        let kind = self.field.palette;
        let mut mapper = match &self.palettes.scalar {
            Some(colors) => ColorMapper::new(Palette::from_hex(kind, colors)?, kind.default_scale()),
            None => ColorMapper::for_kind(kind),
        };
        if let Some(scale) = self.field.scale {
            mapper = mapper.with_scale(scale);
        }
        Ok(mapper.with_swap(self.field.swap))
    }

    pub fn vector_mapper(&self) -> FieldResult<ColorMapper> {
        match &self.palettes.vector {
            Some(colors) => Ok(ColorMapper::new(
                Palette::from_hex(PaletteKind::Vector, colors)?,
                ScaleMode::Linear,
            )),
            None => Ok(ColorMapper::for_kind(PaletteKind::Vector)),
        }
    }

    pub fn vector_scale(&self) -> f64 {
        self.vectors
            .as_ref()
            .map_or_else(default_vector_scale, |v| v.scale)
    }

    pub fn scalar_query(&self) -> FrameQuery {
        FrameQuery {
            operation: field_common::query::OP_SCALAR_FRAME.to_string(),
            params: self.field.params.clone(),
        }
    }

    pub fn vector_query(&self) -> Option<FrameQuery> {
        self.vectors.as_ref().map(|v| FrameQuery {
            operation: field_common::query::OP_VECTOR_FRAME.to_string(),
            params: v.params.clone(),
        })
    }

    pub fn playback_config(&self, frame_count: usize) -> PlaybackConfig {
        PlaybackConfig::new(frame_count)
            .with_debounce(Duration::from_millis(self.playback.debounce_ms))
            .with_frame_period(Duration::from_millis(self.playback.frame_period_ms.max(1)))
    }

    /// Viewport over the configured bbox, or the extent of `features`.
    pub fn viewport(&self, features: &[FeatureRecord]) -> Viewport {
        let bounds = pad_degenerate(match self.viewport.bbox {
            Some([min_x, min_y, max_x, max_y]) => BoundingBox::new(min_x, min_y, max_x, max_y),
            None => features_extent(features),
        });
        debug!(
            width = self.viewport.width,
            height = self.viewport.height,
            min_x = bounds.min_x,
            min_y = bounds.min_y,
            max_x = bounds.max_x,
            max_y = bounds.max_y,
            "Viewer viewport"
        );
        Viewport::new(self.viewport.width, self.viewport.height, bounds)
    }
}

fn features_extent(features: &[FeatureRecord]) -> BoundingBox {
    let corners = features
        .iter()
        .filter_map(|f| f.geometry.bbox())
        .flat_map(|b| [(b.min_x, b.min_y), (b.max_x, b.max_y)]);
    BoundingBox::enclosing(corners).unwrap_or(BoundingBox::new(-180.0, -85.0, 180.0, 85.0))
}

/// Half-size in degrees given to an extent that collapses to a line or point.
const MIN_EXTENT_PAD_DEG: f64 = 0.01;

/// Widen zero-width or zero-height bounds so projection stays finite.
fn pad_degenerate(bounds: BoundingBox) -> BoundingBox {
    let (mut min_x, mut max_x) = (bounds.min_x, bounds.max_x);
    let (mut min_y, mut max_y) = (bounds.min_y, bounds.max_y);
    if !(bounds.width() > 0.0) {
        let cx = (min_x + max_x) / 2.0;
        min_x = cx - MIN_EXTENT_PAD_DEG;
        max_x = cx + MIN_EXTENT_PAD_DEG;
    }
    if !(bounds.height() > 0.0) {
        let cy = (min_y + max_y) / 2.0;
        min_y = cy - MIN_EXTENT_PAD_DEG;
        max_y = cy + MIN_EXTENT_PAD_DEG;
    }
    BoundingBox::new(min_x, min_y, max_x, max_y)
}
