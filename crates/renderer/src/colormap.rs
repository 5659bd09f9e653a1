//! Value → color mapping over curated palettes.
//!
//! A value is normalized into `t ∈ [0, 1]` against a `[vmin, vmax]` domain,
//! linearly or logarithmically, optionally inverted, and then looked up in a
//! palette by interpolating between the two stops bracketing `t`.

use field_common::{FieldError, FieldResult};
use serde::{Deserialize, Serialize};

/// Returned for non-finite values: "no data", drawn fully transparent.
pub const NO_DATA_COLOR: Color = Color::new(128, 128, 128, 0);

/// Returned when `vmin == vmax` (or the domain is not finite).
pub const DEGENERATE_COLOR: Color = Color::new(49, 130, 189, 255);

/// Shift applied before taking logarithms.
pub const LOG_EPSILON: f64 = 1e-6;

/// Floor for the normalization spread.
pub const MIN_SPREAD: f64 = 1e-12;

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// Pack RGBA bytes into a u32, used as the cache key for a painted color.
    #[inline(always)]
    pub fn key(&self) -> u32 {
        (self.r as u32) | ((self.g as u32) << 8) | ((self.b as u32) << 16) | ((self.a as u32) << 24)
    }

    /// CSS-style string for host widgets.
    pub fn to_css(&self) -> String {
        format!(
            "rgba({},{},{},{:.3})",
            self.r,
            self.g,
            self.b,
            self.a as f64 / 255.0
        )
    }

    /// Linear interpolation between two colors, `t` clamped to [0, 1].
    pub fn lerp(&self, other: &Color, t: f64) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

/// Selects the curated ramp and default scale for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteKind {
    /// Water depth and other fields spanning orders of magnitude
    Depth,
    /// Vector magnitude (current speed)
    Vector,
    /// Concentrations, temperatures and everything else
    #[default]
    Generic,
}

impl PaletteKind {
    pub fn default_scale(&self) -> ScaleMode {
        match self {
            PaletteKind::Depth => ScaleMode::Logarithmic,
            PaletteKind::Vector | PaletteKind::Generic => ScaleMode::Linear,
        }
    }

    /// Built-in palette for this kind.
    pub fn palette(&self) -> Palette {
        let colors: &[Color] = match self {
            PaletteKind::Depth => &DEPTH_RAMP,
            PaletteKind::Vector => &SPEED_RAMP,
            PaletteKind::Generic => &THERMAL_RAMP,
        };
        Palette::evenly_spaced(*self, colors)
    }
}

/// Light to deep blue.
const DEPTH_RAMP: [Color; 9] = [
    Color::rgb(247, 251, 255),
    Color::rgb(222, 235, 247),
    Color::rgb(198, 219, 239),
    Color::rgb(158, 202, 225),
    Color::rgb(107, 174, 214),
    Color::rgb(66, 146, 198),
    Color::rgb(33, 113, 181),
    Color::rgb(8, 81, 156),
    Color::rgb(8, 48, 107),
];

/// Calm gray through cyan and yellow to dark red.
const SPEED_RAMP: [Color; 6] = [
    Color::rgb(200, 200, 200),
    Color::rgb(0, 200, 255),
    Color::rgb(255, 255, 0),
    Color::rgb(255, 165, 0),
    Color::rgb(139, 0, 0),
    Color::rgb(75, 0, 0),
];

/// Deep purple through blue, cyan, green, yellow, orange to dark red.
const THERMAL_RAMP: [Color; 8] = [
    Color::rgb(25, 0, 76),
    Color::rgb(0, 0, 255),
    Color::rgb(0, 255, 255),
    Color::rgb(0, 255, 0),
    Color::rgb(255, 255, 0),
    Color::rgb(255, 165, 0),
    Color::rgb(255, 0, 0),
    Color::rgb(139, 0, 0),
];

/// Normalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    #[default]
    Linear,
    Logarithmic,
}

impl ScaleMode {
    /// Mode actually applied for a domain.
    ///
    /// Logarithmic silently degrades to linear when either bound is
    /// non-positive after the epsilon shift.
    pub fn effective(self, vmin: f64, vmax: f64) -> ScaleMode {
        match self {
            ScaleMode::Logarithmic if vmin + LOG_EPSILON > 0.0 && vmax + LOG_EPSILON > 0.0 => {
                ScaleMode::Logarithmic
            }
            _ => ScaleMode::Linear,
        }
    }
}

/// A color stop in a palette.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    /// Position along the ramp in [0, 1]
    pub position: f64,
    pub color: Color,
}

/// Ordered color stops plus the kind tag they were curated for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    kind: PaletteKind,
    stops: Vec<ColorStop>,
}

impl Palette {
    /// Build a palette from explicit stops, validating their order.
    pub fn new(kind: PaletteKind, stops: Vec<ColorStop>) -> FieldResult<Self> {
        if stops.len() < 2 {
            return Err(FieldError::InvalidPalette(format!(
                "palette must have at least 2 color stops, got {}",
                stops.len()
            )));
        }
        for stop in &stops {
            if !(0.0..=1.0).contains(&stop.position) {
                return Err(FieldError::InvalidPalette(format!(
                    "stop position {} outside [0, 1]",
                    stop.position
                )));
            }
        }
        if stops.windows(2).any(|w| w[1].position < w[0].position) {
            return Err(FieldError::InvalidPalette(
                "color stops must be in ascending position order".to_string(),
            ));
        }
        Ok(Self { kind, stops })
    }

    /// Build a palette from hex colors placed at equal spacing.
    pub fn from_hex(kind: PaletteKind, colors: &[String]) -> FieldResult<Self> {
        let parsed = colors
            .iter()
            .map(|c| {
                Color::from_hex(c)
                    .ok_or_else(|| FieldError::InvalidPalette(format!("invalid color '{}'", c)))
            })
            .collect::<FieldResult<Vec<_>>>()?;
        if parsed.len() < 2 {
            return Err(FieldError::InvalidPalette(format!(
                "palette must have at least 2 color stops, got {}",
                parsed.len()
            )));
        }
        Ok(Self::evenly_spaced(kind, &parsed))
    }

    /// Place colors at positions `i / (n - 1)`. Callers guarantee `n >= 2`.
    fn evenly_spaced(kind: PaletteKind, colors: &[Color]) -> Self {
        let last = (colors.len().max(2) - 1) as f64;
        let stops = colors
            .iter()
            .enumerate()
            .map(|(i, &color)| ColorStop {
                position: i as f64 / last,
                color,
            })
            .collect();
        Self { kind, stops }
    }

    pub fn kind(&self) -> PaletteKind {
        self.kind
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color at normalized position `t`, interpolated between the two
    /// bracketing stops only.
    pub fn sample(&self, t: f64) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        for pair in self.stops.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if t <= hi.position {
                let span = hi.position - lo.position;
                let local = if span <= 0.0 {
                    0.0
                } else {
                    (t - lo.position) / span
                };
                return lo.color.lerp(&hi.color, local);
            }
        }
        self.stops
            .last()
            .map(|s| s.color)
            .unwrap_or(NO_DATA_COLOR)
    }
}

/// Palette plus normalization settings. One parameterized mapper serves every
/// field; palette kind, scale and swap are data.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMapper {
    palette: Palette,
    scale: ScaleMode,
    swap: bool,
}

impl ColorMapper {
    pub fn new(palette: Palette, scale: ScaleMode) -> Self {
        Self {
            palette,
            scale,
            swap: false,
        }
    }

    /// Built-in palette and default scale for a kind.
    pub fn for_kind(kind: PaletteKind) -> Self {
        Self::new(kind.palette(), kind.default_scale())
    }

    /// Invert the ramp (e.g. depth shown as negative elevation).
    pub fn with_swap(mut self, swap: bool) -> Self {
        self.swap = swap;
        self
    }

    pub fn with_scale(mut self, scale: ScaleMode) -> Self {
        self.scale = scale;
        self
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn scale(&self) -> ScaleMode {
        self.scale
    }

    pub fn swap(&self) -> bool {
        self.swap
    }

    /// Position of `value` along the domain in [0, 1], before swapping.
    ///
    /// `None` for non-finite values and degenerate or non-finite domains.
    pub fn position(&self, value: f64, vmin: f64, vmax: f64) -> Option<f64> {
        if !value.is_finite() || !vmin.is_finite() || !vmax.is_finite() || vmin == vmax {
            return None;
        }

        let t = match self.scale.effective(vmin, vmax) {
            ScaleMode::Linear => (value - vmin) / floor_spread(vmax - vmin),
            ScaleMode::Logarithmic => {
                let v = value.clamp(vmin.min(vmax), vmin.max(vmax));
                let lo = (vmin + LOG_EPSILON).ln();
                let hi = (vmax + LOG_EPSILON).ln();
                ((v + LOG_EPSILON).ln() - lo) / floor_spread(hi - lo)
            }
        };
        Some(t.clamp(0.0, 1.0))
    }

    /// Normalized ramp coordinate, swap applied.
    pub fn normalize(&self, value: f64, vmin: f64, vmax: f64) -> Option<f64> {
        self.position(value, vmin, vmax)
            .map(|t| if self.swap { 1.0 - t } else { t })
    }

    /// Color for a value against `[vmin, vmax]`.
    pub fn color_for(&self, value: f64, vmin: f64, vmax: f64) -> Color {
        if !value.is_finite() {
            return NO_DATA_COLOR;
        }
        match self.normalize(value, vmin, vmax) {
            Some(t) => self.palette.sample(t),
            None => DEGENERATE_COLOR,
        }
    }
}

/// Color for a value using the built-in palette and scale of `kind`.
pub fn color_for(value: f64, vmin: f64, vmax: f64, kind: PaletteKind, swap: bool) -> Color {
    ColorMapper::for_kind(kind)
        .with_swap(swap)
        .color_for(value, vmin, vmax)
}

#[inline]
fn floor_spread(spread: f64) -> f64 {
    if spread.abs() < MIN_SPREAD {
        MIN_SPREAD.copysign(spread)
    } else {
        spread
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex("#FF0000"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::from_hex("00ff0080"), Some(Color::new(0, 255, 0, 128)));
        assert_eq!(Color::from_hex("#GGGGGG"), None);
        assert_eq!(Color::from_hex("#FFF"), None);
    }

    #[test]
    fn test_key_distinguishes_alpha() {
        assert_ne!(Color::new(1, 2, 3, 255).key(), Color::new(1, 2, 3, 0).key());
    }

    #[test]
    fn test_palette_ends() {
        let palette = PaletteKind::Generic.palette();
        assert_eq!(palette.sample(0.0), THERMAL_RAMP[0]);
        assert_eq!(palette.sample(1.0), THERMAL_RAMP[7]);
    }

    #[test]
    fn test_floor_spread_keeps_sign() {
        assert_eq!(floor_spread(0.0), MIN_SPREAD);
        assert_eq!(floor_spread(-1e-20), -MIN_SPREAD);
        assert_eq!(floor_spread(3.0), 3.0);
    }
}
