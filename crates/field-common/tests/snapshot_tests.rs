//! Tests for snapshot and envelope deserialization as received from the backend.

use field_common::geometry::{FeatureRecord, Geometry};
use field_common::query::{QueryResponse, OP_FIELD_SNAPSHOT};
use field_common::{FieldError, FieldSnapshot, VectorSnapshot};

// ============================================================================
// Scalar snapshot tests
// ============================================================================

#[test]
fn test_scalar_snapshot_from_envelope() {
    let json = r#"{
        "status": "ok",
        "content": {
            "timestamps": ["2024-03-01T00:00:00Z", "2024-03-01T01:00:00Z"],
            "values_by_time": [[1.0, null], [2.5, 3.0]]
        }
    }"#;
    let resp: QueryResponse = serde_json::from_str(json).unwrap();
    let snap: FieldSnapshot = resp.into_typed(OP_FIELD_SNAPSHOT).unwrap();

    assert_eq!(snap.frame_count(), 2);
    assert_eq!(snap.values_at(0).unwrap(), &[Some(1.0), None]);
    assert_eq!(snap.global_range(), Some((1.0, 3.0)));
}

#[test]
fn test_error_envelope_is_data_error() {
    let resp = QueryResponse::error("simulation not finished");
    let err = resp.into_typed::<FieldSnapshot>(OP_FIELD_SNAPSHOT).unwrap_err();
    assert!(matches!(err, FieldError::Query { .. }));
    assert!(err.is_data_error());
}

#[test]
fn test_snapshot_without_values_has_no_range() {
    let snap = FieldSnapshot::new(Vec::new(), Vec::new()).unwrap();
    assert_eq!(snap.global_range(), None);
    assert_eq!(snap.frame_count(), 0);
}

// ============================================================================
// Vector snapshot tests
// ============================================================================

#[test]
fn test_vector_snapshot_magnitude_range() {
    let json = r#"{
        "timestamps": ["2024-03-01T00:00:00Z"],
        "frames": [[
            {"x": 105.0, "y": 10.0, "u": 3.0, "v": 4.0},
            {"x": 105.1, "y": 10.1, "u": 0.0, "v": 0.0, "magnitude": 9.0}
        ]]
    }"#;
    let snap: VectorSnapshot = serde_json::from_str(json).unwrap();
    assert_eq!(snap.magnitude_range(), Some((5.0, 9.0)));
    assert_eq!(snap.frame(0).unwrap().len(), 2);
    assert!(snap.frame(1).is_err());
}

// ============================================================================
// Feature record tests
// ============================================================================

#[test]
fn test_feature_record_geometry_roundtrip_shape() {
    let json = r#"{
        "id": 7,
        "geometry": {"type": "polygon", "coordinates": [
            {"lat": 0.0, "lng": 0.0}, {"lat": 0.0, "lng": 1.0}, {"lat": 1.0, "lng": 1.0}
        ]}
    }"#;
    let record: FeatureRecord = serde_json::from_str(json).unwrap();
    assert_eq!(record.id.0, 7);
    assert!(record.current_value.is_none());
    assert!(matches!(record.geometry, Geometry::Polygon(ref ring) if ring.len() == 3));
}
