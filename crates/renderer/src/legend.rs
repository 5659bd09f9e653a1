//! Colorbar ticks, value labels and the legend model handed to host widgets.

use serde::Serialize;
use tracing::debug;

use crate::colormap::{Color, ColorMapper, ScaleMode, DEGENERATE_COLOR, LOG_EPSILON};

/// Below this range a colorbar collapses to a single tick.
pub const TICK_RANGE_THRESHOLD: f64 = 1e-9;

/// Magnitudes below this are labelled in scientific notation.
pub const SCI_THRESHOLD: f64 = 1e-3;

/// Number of colors sampled along the legend gradient.
pub const GRADIENT_SAMPLES: usize = 32;

const MAX_DECIMALS: i32 = 6;
const DEFAULT_DECIMALS: usize = 2;

/// `n` evenly spaced values from `min` to `max` inclusive.
///
/// A single `[min]` when the range is below [`TICK_RANGE_THRESHOLD`] or `n <= 1`.
pub fn colorbar_ticks(min: f64, max: f64, n: usize) -> Vec<f64> {
    if n <= 1 || !((max - min).abs() >= TICK_RANGE_THRESHOLD) {
        return vec![min];
    }
    let step = (max - min) / (n - 1) as f64;
    (0..n)
        .map(|i| if i == n - 1 { max } else { min + step * i as f64 })
        .collect()
}

/// Ticks evenly spaced in log space, for logarithmic colorbars.
///
/// Falls back to [`colorbar_ticks`] when the domain cannot be shown on a log scale.
pub fn colorbar_ticks_log(min: f64, max: f64, n: usize) -> Vec<f64> {
    if ScaleMode::Logarithmic.effective(min, max) == ScaleMode::Linear {
        return colorbar_ticks(min, max, n);
    }
    let lo = (min + LOG_EPSILON).ln();
    let hi = (max + LOG_EPSILON).ln();
    colorbar_ticks(lo, hi, n)
        .into_iter()
        .enumerate()
        .map(|(i, l)| match i {
            0 => min,
            _ if i == n - 1 => max,
            _ => l.exp() - LOG_EPSILON,
        })
        .collect()
}

/// Ticks following the mapper's effective scale.
pub fn ticks_for(mapper: &ColorMapper, min: f64, max: f64, n: usize) -> Vec<f64> {
    match mapper.scale().effective(min, max) {
        ScaleMode::Linear => colorbar_ticks(min, max, n),
        ScaleMode::Logarithmic => colorbar_ticks_log(min, max, n),
    }
}

/// Discrete step palette for profile and heatmap charts: one color per tick.
pub fn discrete_palette(mapper: &ColorMapper, min: f64, max: f64, n: usize) -> Vec<(f64, Color)> {
    ticks_for(mapper, min, max, n)
        .into_iter()
        .map(|v| (v, mapper.color_for(v, min, max)))
        .collect()
}

/// Smallest absolute difference between adjacent ticks; 0 for fewer than two.
pub fn min_tick_diff(ticks: &[f64]) -> f64 {
    ticks
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .filter(|d| *d > 0.0)
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.min(d))))
        .unwrap_or(0.0)
}

/// Human-readable label for a value.
///
/// Scientific notation with superscript exponent below [`SCI_THRESHOLD`];
/// otherwise fixed point with precision taken from `min_diff`, the smallest
/// meaningful difference between adjacent ticks.
pub fn format_value(value: f64, min_diff: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    if value.abs() < SCI_THRESHOLD {
        let mut exponent = value.abs().log10().floor() as i32;
        let mut mantissa = value / 10f64.powi(exponent);
        if (mantissa.abs() * 100.0).round() >= 1000.0 {
            exponent += 1;
            mantissa /= 10.0;
        }
        return format!("{:.2}×10{}", mantissa, superscript(exponent));
    }

    let decimals = if min_diff > 0.0 && min_diff.is_finite() {
        (-min_diff.log10()).ceil().clamp(0.0, MAX_DECIMALS as f64) as usize
    } else {
        DEFAULT_DECIMALS
    };
    format!("{:.*}", decimals, value)
}

fn superscript(exponent: i32) -> String {
    exponent
        .to_string()
        .chars()
        .map(|c| match c {
            '-' => '⁻',
            '0' => '⁰',
            '1' => '¹',
            '2' => '²',
            '3' => '³',
            '4' => '⁴',
            '5' => '⁵',
            '6' => '⁶',
            '7' => '⁷',
            '8' => '⁸',
            '9' => '⁹',
            other => other,
        })
        .collect()
}

/// One labelled tick along the colorbar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendTick {
    pub value: f64,
    pub label: String,
    /// Position along the bar in [0, 1]
    pub position: f64,
}

/// Legend model: title, gradient and tick labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: String,
    /// Scale actually applied (after the log → linear fallback)
    pub scale: ScaleMode,
    pub gradient: Vec<Color>,
    pub ticks: Vec<LegendTick>,
}

impl Legend {
    /// Build the legend for a mapper over `[vmin, vmax]`.
    pub fn build(title: impl Into<String>, mapper: &ColorMapper, vmin: f64, vmax: f64, n_ticks: usize) -> Self {
        let title = title.into();
        let scale = mapper.scale().effective(vmin, vmax);
        if scale != mapper.scale() {
            debug!(
                title = %title,
                vmin = vmin,
                vmax = vmax,
                "Logarithmic legend requested for non-positive domain, using linear"
            );
        }

        let degenerate = mapper.position(vmin, vmin, vmax).is_none();
        let gradient = if degenerate {
            vec![DEGENERATE_COLOR; GRADIENT_SAMPLES]
        } else {
            ticks_for(mapper, vmin, vmax, GRADIENT_SAMPLES)
                .into_iter()
                .map(|v| mapper.color_for(v, vmin, vmax))
                .collect()
        };

        let values = ticks_for(mapper, vmin, vmax, n_ticks);
        let min_diff = min_tick_diff(&values);
        let ticks = values
            .into_iter()
            .map(|value| LegendTick {
                value,
                label: format_value(value, min_diff),
                position: mapper.position(value, vmin, vmax).unwrap_or(0.0),
            })
            .collect();

        Self {
            title,
            scale,
            gradient,
            ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superscript() {
        assert_eq!(superscript(-4), "⁻⁴");
        assert_eq!(superscript(12), "¹²");
    }

    #[test]
    fn test_min_tick_diff() {
        assert_eq!(min_tick_diff(&[0.0, 0.5, 2.0]), 0.5);
        assert_eq!(min_tick_diff(&[1.0]), 0.0);
    }

    #[test]
    fn test_mantissa_rollover() {
        // 9.999e-5 rounds to 10.00 in the mantissa and must carry into the exponent
        assert_eq!(format_value(9.999e-5, 0.0), "1.00×10⁻⁴");
    }
}
