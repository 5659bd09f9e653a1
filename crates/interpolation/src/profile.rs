//! Polyline resampling into distance-ordered profiles.

use field_common::GeoPoint;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geodesy::{distance, lerp_point};
use crate::idw::{interpolate, IdwOptions, Sample};

/// Upper bound on the pieces one segment is split into.
pub const MAX_PIECES_PER_SEGMENT: usize = 10_000;

/// A vertex of a user-drawn path. `value` is set when the vertex was snapped
/// to a feature with a known value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathVertex {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub value: Option<f64>,
}

impl PathVertex {
    pub fn new(lat: f64, lng: f64, value: Option<f64>) -> Self {
        Self { lat, lng, value }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// One point of a profile chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    /// Great-circle distance from the path origin in meters
    pub distance: f64,
    pub value: f64,
    pub lat: f64,
    pub lng: f64,
}

impl ProfilePoint {
    /// `[distance, value, lat, lng]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.distance, self.value, self.lat, self.lng]
    }
}

/// Resample `path` into profile points roughly `spacing_m` apart.
///
/// Each segment is split into `max(1, floor(len / spacing_m))` pieces, at
/// most [`MAX_PIECES_PER_SEGMENT`].
/// Vertices keep their own value when present; every other point is
/// interpolated from `samples`, falling back to a linear blend of the
/// segment's endpoint values. Points whose value cannot be resolved are
/// skipped. The output is sorted ascending by distance from the origin.
pub fn resample_polyline(
    path: &[PathVertex],
    samples: &[Sample],
    spacing_m: f64,
    options: IdwOptions,
) -> Vec<ProfilePoint> {
    let Some(first) = path.first() else {
        return Vec::new();
    };
    let origin = first.location();
    let mut points = Vec::new();

    let mut emit = |location: GeoPoint, value: Option<f64>| {
        if let Some(value) = value {
            points.push(ProfilePoint {
                distance: distance(origin, location),
                value,
                lat: location.lat,
                lng: location.lng,
            });
        }
    };

    for segment in path.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        let a_value = vertex_value(&a, samples, options);
        let b_value = vertex_value(&b, samples, options);
        let pieces = piece_count(distance(a.location(), b.location()), spacing_m);

        emit(a.location(), a_value);
        for k in 1..pieces {
            let t = k as f64 / pieces as f64;
            let location = lerp_point(a.location(), b.location(), t);
            let value = interpolate(location, samples, options).or(match (a_value, b_value) {
                (Some(va), Some(vb)) => Some(va + (vb - va) * t),
                _ => None,
            });
            emit(location, value);
        }
    }

    if let Some(last) = path.last() {
        emit(last.location(), vertex_value(last, samples, options));
    }

    points.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    debug!(
        vertices = path.len(),
        points = points.len(),
        spacing_m = spacing_m,
        "Resampled polyline"
    );
    points
}

fn vertex_value(vertex: &PathVertex, samples: &[Sample], options: IdwOptions) -> Option<f64> {
    vertex
        .value
        .filter(|v| v.is_finite())
        .or_else(|| interpolate(vertex.location(), samples, options))
}

fn piece_count(length: f64, spacing_m: f64) -> usize {
    if !(spacing_m > 0.0) || !(length > 0.0) || !length.is_finite() {
        return 1;
    }
    let pieces = (length / spacing_m).floor().min(MAX_PIECES_PER_SEGMENT as f64);
    (pieces as usize).max(1)
}
