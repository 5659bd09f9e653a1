//! Inverse-distance-weighted interpolation.

use field_common::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::geodesy::distance;

/// Default IDW exponent. High values make the nearest samples dominate.
pub const DEFAULT_POWER: f64 = 5.0;

/// A scalar sample at a location (typically a feature centroid).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub lat: f64,
    pub lng: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(lat: f64, lng: f64, value: f64) -> Self {
        Self { lat, lng, value }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// IDW parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdwOptions {
    pub power: f64,
    /// Samples farther than this (meters) are excluded
    pub max_distance: f64,
}

impl Default for IdwOptions {
    fn default() -> Self {
        Self {
            power: DEFAULT_POWER,
            max_distance: f64::INFINITY,
        }
    }
}

/// Interpolate a value at `point` from `samples`.
///
/// A sample at zero distance is returned as an exact match. Samples beyond
/// `max_distance` or with non-finite values or positions are ignored. Returns
/// `None` for a non-finite `point` or when nothing remains; the caller falls
/// back to blending path endpoints.
pub fn interpolate(point: GeoPoint, samples: &[Sample], options: IdwOptions) -> Option<f64> {
    if !point.lat.is_finite() || !point.lng.is_finite() {
        return None;
    }

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for sample in samples {
        if !sample.value.is_finite() {
            continue;
        }
        let d = distance(point, sample.location());
        if d.is_nan() {
            continue;
        }
        if d == 0.0 {
            return Some(sample.value);
        }
        if d > options.max_distance {
            continue;
        }
        let w = 1.0 / d.powf(options.power);
        if w.is_infinite() {
            // Underflowed distance: as good as an exact hit
            return Some(sample.value);
        }
        weighted_sum += w * sample.value;
        weight_total += w;
    }

    if weight_total > 0.0 {
        Some(weighted_sum / weight_total)
    } else {
        None
    }
}
