//! Common test fixtures: features, snapshots, vector frames and viewports.

use chrono::{DateTime, TimeZone, Utc};
use field_common::{BoundingBox, FeatureRecord, FieldSnapshot, GeoPoint, Geometry, VectorSample, Viewport};
use serde_json::{json, Value};

/// Common bounding box definitions for testing.
pub mod bbox {
    use field_common::BoundingBox;

    /// Small estuary-sized area around the origin
    pub const ESTUARY: BoundingBox = BoundingBox {
        min_x: -1.0,
        min_y: -1.0,
        max_x: 3.0,
        max_y: 2.0,
    };

    /// Area with nothing from the default fixtures in it
    pub const ELSEWHERE: BoundingBox = BoundingBox {
        min_x: 100.0,
        min_y: 40.0,
        max_x: 101.0,
        max_y: 41.0,
    };
}

/// Hourly timestamp on a fixed day.
pub fn ts(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// Axis-aligned square cell with its lower-left corner at `(lng, lat)`.
pub fn square(id: u64, lng: f64, lat: f64, size: f64) -> FeatureRecord {
    FeatureRecord::new(
        id,
        Geometry::Polygon(vec![
            GeoPoint::new(lat, lng),
            GeoPoint::new(lat, lng + size),
            GeoPoint::new(lat + size, lng + size),
            GeoPoint::new(lat + size, lng),
        ]),
    )
}

/// Observation point feature.
pub fn point(id: u64, lng: f64, lat: f64) -> FeatureRecord {
    FeatureRecord::new(id, Geometry::Point(GeoPoint::new(lat, lng)))
}

/// Two adjacent unit cells: feature 0 covers lng [0, 1], feature 1 lng [1, 2].
pub fn two_cells() -> Vec<FeatureRecord> {
    vec![square(0, 0.0, 0.0, 1.0), square(1, 1.0, 0.0, 1.0)]
}

/// Three timestamps over two features: `[[1, 2], [3, 4], [5, null]]`.
pub fn three_step_snapshot() -> FieldSnapshot {
    FieldSnapshot::new(
        vec![ts(0), ts(1), ts(2)],
        vec![
            vec![Some(1.0), Some(2.0)],
            vec![Some(3.0), Some(4.0)],
            vec![Some(5.0), None],
        ],
    )
    .expect("valid fixture snapshot")
}

/// A `cols x rows` grid of square cells covering `bounds`, ids row-major.
pub fn mesh_features(cols: usize, rows: usize, bounds: BoundingBox) -> Vec<FeatureRecord> {
    let dx = bounds.width() / cols as f64;
    let dy = bounds.height() / rows as f64;
    let mut features = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        for col in 0..cols {
            let lng = bounds.min_x + col as f64 * dx;
            let lat = bounds.min_y + row as f64 * dy;
            let id = (row * cols + col) as u64;
            features.push(FeatureRecord::new(
                id,
                Geometry::Polygon(vec![
                    GeoPoint::new(lat, lng),
                    GeoPoint::new(lat, lng + dx),
                    GeoPoint::new(lat + dy, lng + dx),
                    GeoPoint::new(lat + dy, lng),
                ]),
            ));
        }
    }
    features
}

/// Evenly spaced arrows with the same `(u, v)` at cell centers of `bounds`.
pub fn uniform_vectors(cols: usize, rows: usize, bounds: BoundingBox, u: f64, v: f64) -> Vec<VectorSample> {
    let dx = bounds.width() / cols as f64;
    let dy = bounds.height() / rows as f64;
    (0..rows)
        .flat_map(|row| {
            (0..cols).map(move |col| {
                VectorSample::new(
                    bounds.min_x + (col as f64 + 0.5) * dx,
                    bounds.min_y + (row as f64 + 0.5) * dy,
                    u,
                    v,
                )
            })
        })
        .collect()
}

/// 400x300 viewport over [`bbox::ESTUARY`].
pub fn estuary_viewport() -> Viewport {
    Viewport::new(400, 300, bbox::ESTUARY)
}

/// `field_snapshot` response content for features and a snapshot.
pub fn snapshot_content(features: &[FeatureRecord], snapshot: &FieldSnapshot) -> Value {
    json!({
        "features": features,
        "timestamps": snapshot.timestamps,
        "values_by_time": snapshot.values_by_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_features_cover_bounds() {
        let features = mesh_features(4, 3, bbox::ESTUARY);
        assert_eq!(features.len(), 12);
        let last = features.last().unwrap().geometry.bbox().unwrap();
        assert!((last.max_x - bbox::ESTUARY.max_x).abs() < 1e-9);
        assert!((last.max_y - bbox::ESTUARY.max_y).abs() < 1e-9);
    }

    #[test]
    fn test_three_step_snapshot_range() {
        assert_eq!(three_step_snapshot().global_range(), Some((1.0, 5.0)));
    }
}
