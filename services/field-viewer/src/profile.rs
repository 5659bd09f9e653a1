//! Path profiles: vertex lookup on the backend, resampling against the
//! current frame, and CSV export.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use field_common::query::OP_PROFILE_LOOKUP;
use field_common::{FieldResult, QueryClient};
use field_layers::TraceSet;
use interpolation::{resample_polyline, IdwOptions, PathVertex, ProfilePoint, Sample};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

#[derive(Debug, Deserialize)]
struct LookupContent {
    vertices: Vec<PathVertex>,
}

/// Ask the backend for the value under each vertex of `path` (`[lon, lat]`
/// pairs). Vertices outside the mesh come back without a value.
pub async fn lookup_vertices<C: QueryClient + ?Sized>(
    client: &C,
    path: &[[f64; 2]],
    params: &Map<String, Value>,
    index: usize,
) -> FieldResult<Vec<PathVertex>> {
    let mut payload = params.clone();
    payload.insert(
        "path".to_string(),
        json!(path.iter().map(|[lng, lat]| json!({"lat": lat, "lng": lng})).collect::<Vec<_>>()),
    );
    payload.insert("index".to_string(), Value::from(index));

    let content: LookupContent = client
        .query(OP_PROFILE_LOOKUP, Value::Object(payload))
        .await?
        .into_typed(OP_PROFILE_LOOKUP)?;
    Ok(content.vertices)
}

/// Resample the looked-up path at `spacing_m` using the frame's samples.
pub fn build_profile(vertices: &[PathVertex], samples: &[Sample], spacing_m: f64) -> Vec<ProfilePoint> {
    resample_polyline(vertices, samples, spacing_m, IdwOptions::default())
}

/// Write a trace set as `<dir>/<name>.csv`.
pub fn write_csv(dir: &Path, name: &str, traces: &TraceSet) -> Result<PathBuf> {
    let path = dir.join(format!("{}.csv", name));
    std::fs::write(&path, traces.to_csv())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), rows = traces.x.len(), "Wrote chart CSV");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::QueryResponse;
    use test_utils::ScriptedQueryClient;

    #[tokio::test]
    async fn test_lookup_sends_path_and_index() {
        let client = ScriptedQueryClient::new().respond(
            OP_PROFILE_LOOKUP,
            QueryResponse::ok(json!({"vertices": [
                {"lat": 0.5, "lng": 0.0, "value": 1.0},
                {"lat": 0.5, "lng": 0.01}
            ]})),
        );
        let mut params = Map::new();
        params.insert("variable".to_string(), json!("salinity"));

        let vertices = lookup_vertices(&client, &[[0.0, 0.5], [0.01, 0.5]], &params, 2)
            .await
            .unwrap();
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[0].value, Some(1.0));
        assert_eq!(vertices[1].value, None);

        let payload = &client.calls_for(OP_PROFILE_LOOKUP)[0];
        assert_eq!(payload["index"], 2);
        assert_eq!(payload["variable"], "salinity");
        assert_eq!(payload["path"][1]["lng"], 0.01);
    }

    #[tokio::test]
    async fn test_lookup_error_maps_to_query_error() {
        let client = ScriptedQueryClient::new()
            .respond(OP_PROFILE_LOOKUP, QueryResponse::error("path leaves the mesh"));
        let err = lookup_vertices(&client, &[[0.0, 0.0]], &Map::new(), 0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("path leaves the mesh"));
    }

    #[test]
    fn test_profile_csv_written() {
        let vertices = [
            PathVertex::new(0.0, 0.0, Some(1.0)),
            PathVertex::new(0.0, 0.01, Some(3.0)),
        ];
        let points = build_profile(&vertices, &[], 500.0);
        assert_eq!(points.first().map(|p| p.value), Some(1.0));
        assert_eq!(points.last().map(|p| p.value), Some(3.0));

        let dir = tempfile::tempdir().unwrap();
        let traces = TraceSet::from_profile("salinity", &points);
        let path = write_csv(dir.path(), "profile", &traces).unwrap();

        let csv = std::fs::read_to_string(path).unwrap();
        assert!(csv.starts_with("distance_m,salinity\n0,1\n"));
        assert_eq!(csv.lines().count(), points.len() + 1);
    }
}
