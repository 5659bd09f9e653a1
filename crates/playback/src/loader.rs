//! Frame loading over the backend query interface.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use field_common::codec::DEFAULT_DECODE_DECIMALS;
use field_common::query::OP_FIELD_SNAPSHOT;
use field_common::{
    decode_packed_f32, decode_packed_values, FeatureRecord, FieldError, FieldResult,
    FieldSnapshot, QueryClient, VectorSample,
};
use futures::future::try_join;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::frame::{FrameData, FrameSource};

/// An operation plus fixed parameters; the frame index is added per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameQuery {
    pub operation: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl FrameQuery {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Request payload for one time index.
    pub fn payload(&self, index: usize) -> Value {
        let mut params = self.params.clone();
        params.insert("index".to_string(), Value::from(index));
        Value::Object(params)
    }
}

/// Features plus the scalar snapshot returned by `field_snapshot`.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotData {
    pub features: Vec<FeatureRecord>,
    pub snapshot: FieldSnapshot,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    features: Vec<FeatureRecord>,
    timestamps: Vec<DateTime<Utc>>,
    values_by_time: Vec<Value>,
}

/// Loads snapshots and per-index frames through a [`QueryClient`].
///
/// Scalar and vector frames are separate operations; either may be
/// unconfigured, in which case that half of the frame is `None`.
pub struct FrameLoader<C: ?Sized> {
    client: Arc<C>,
    scalar: Option<FrameQuery>,
    vector: Option<FrameQuery>,
    decimals: u32,
}

impl<C: QueryClient + ?Sized> FrameLoader<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            scalar: None,
            vector: None,
            decimals: DEFAULT_DECODE_DECIMALS,
        }
    }

    pub fn with_scalar(mut self, query: FrameQuery) -> Self {
        self.scalar = Some(query);
        self
    }

    pub fn with_vector(mut self, query: FrameQuery) -> Self {
        self.vector = Some(query);
        self
    }

    /// Decimal places kept when decoding packed arrays.
    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    /// Load the features and all-timestamp scalar values.
    pub async fn load_snapshot(&self, params: Value) -> FieldResult<SnapshotData> {
        let content = self
            .client
            .query(OP_FIELD_SNAPSHOT, params)
            .await?
            .into_content(OP_FIELD_SNAPSHOT)?;
        let raw: RawSnapshot = serde_json::from_value(content)?;

        let values_by_time = raw
            .values_by_time
            .iter()
            .map(|row| decode_values(row, self.decimals))
            .collect::<FieldResult<Vec<_>>>()?;
        let snapshot = FieldSnapshot::new(raw.timestamps, values_by_time)?;

        if let Some(row) = snapshot.values_by_time.first() {
            if !raw.features.is_empty() && row.len() != raw.features.len() {
                return Err(FieldError::InvalidSnapshot(format!(
                    "{} features but {} values per timestamp",
                    raw.features.len(),
                    row.len()
                )));
            }
        }

        debug!(
            features = raw.features.len(),
            frames = snapshot.frame_count(),
            "Loaded field snapshot"
        );

        Ok(SnapshotData {
            features: raw.features,
            snapshot,
        })
    }

    async fn load_scalar(&self, index: usize) -> FieldResult<Option<Vec<Option<f64>>>> {
        let Some(query) = &self.scalar else {
            return Ok(None);
        };
        let content = self.fetch(query, index).await?;
        decode_values(&content, self.decimals).map(Some)
    }

    async fn load_vectors(&self, index: usize) -> FieldResult<Option<Vec<VectorSample>>> {
        let Some(query) = &self.vector else {
            return Ok(None);
        };
        let content = self.fetch(query, index).await?;
        decode_vectors(&content, self.decimals).map(Some)
    }

    async fn fetch(&self, query: &FrameQuery, index: usize) -> FieldResult<Value> {
        self.client
            .query(&query.operation, query.payload(index))
            .await?
            .into_content(&query.operation)
    }
}

#[async_trait]
impl<C: QueryClient + ?Sized + 'static> FrameSource for FrameLoader<C> {
    async fn load_frame(&self, index: usize) -> FieldResult<FrameData> {
        let (scalar, vectors) = try_join(self.load_scalar(index), self.load_vectors(index)).await?;
        Ok(FrameData {
            index,
            scalar,
            vectors,
        })
    }
}

/// Scalar values from `{"values": ...}` or a bare value. Packed strings and
/// JSON arrays (with `null` for no data) are both accepted.
pub fn decode_values(content: &Value, decimals: u32) -> FieldResult<Vec<Option<f64>>> {
    let values = content.get("values").unwrap_or(content);
    match values {
        Value::String(encoded) => decode_packed_values(encoded, decimals),
        Value::Array(_) => Ok(serde_json::from_value(values.clone())?),
        other => Err(FieldError::Decode(format!(
            "expected packed string or array of values, got {}",
            json_kind(other)
        ))),
    }
}

/// Vector samples from `{"samples": [...]}` or packed `x`/`y`/`u`/`v`
/// columns with an optional `magnitude` column.
pub fn decode_vectors(content: &Value, decimals: u32) -> FieldResult<Vec<VectorSample>> {
    if let Some(samples) = content.get("samples") {
        return Ok(serde_json::from_value(samples.clone())?);
    }

    let column = |name: &str| -> FieldResult<Vec<f64>> {
        match content.get(name) {
            Some(Value::String(encoded)) => decode_packed_f32(encoded, decimals),
            _ => Err(FieldError::Decode(format!("missing packed column '{}'", name))),
        }
    };

    let x = column("x")?;
    let y = column("y")?;
    let u = column("u")?;
    let v = column("v")?;
    let magnitude = match content.get("magnitude") {
        Some(Value::String(encoded)) => Some(decode_packed_values(encoded, decimals)?),
        _ => None,
    };

    let n = x.len();
    let lengths_match = [y.len(), u.len(), v.len()].iter().all(|len| *len == n)
        && magnitude.as_ref().map_or(true, |m| m.len() == n);
    if !lengths_match {
        return Err(FieldError::Decode(
            "packed vector columns have different lengths".to_string(),
        ));
    }

    Ok((0..n)
        .map(|i| VectorSample {
            x: x[i],
            y: y[i],
            u: u[i],
            v: v[i],
            magnitude: magnitude.as_ref().and_then(|m| m[i]),
        })
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::codec::encode_packed_f32;
    use serde_json::json;

    #[test]
    fn test_payload_adds_index() {
        let query = FrameQuery::new("scalar_frame").with_param("variable", "salinity");
        assert_eq!(
            query.payload(4),
            json!({"variable": "salinity", "index": 4})
        );
    }

    #[test]
    fn test_decode_values_array_with_nulls() {
        let values = decode_values(&json!({"values": [1.5, null, 3.0]}), 4).unwrap();
        assert_eq!(values, vec![Some(1.5), None, Some(3.0)]);
    }

    #[test]
    fn test_decode_values_packed_rounds() {
        let encoded = encode_packed_f32(&[1.23456, f64::NAN]);
        let values = decode_values(&json!({ "values": encoded }), 2).unwrap();
        assert_eq!(values, vec![Some(1.23), None]);
    }

    #[test]
    fn test_decode_values_rejects_object() {
        assert!(matches!(
            decode_values(&json!({"values": {"a": 1}}), 2),
            Err(FieldError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_vectors_packed_columns() {
        let content = json!({
            "x": encode_packed_f32(&[10.0, 11.0]),
            "y": encode_packed_f32(&[50.0, 51.0]),
            "u": encode_packed_f32(&[1.0, 0.0]),
            "v": encode_packed_f32(&[0.0, -2.0]),
        });
        let samples = decode_vectors(&content, 3).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1], VectorSample::new(11.0, 51.0, 0.0, -2.0));
    }

    #[test]
    fn test_decode_vectors_length_mismatch() {
        let content = json!({
            "x": encode_packed_f32(&[10.0, 11.0]),
            "y": encode_packed_f32(&[50.0]),
            "u": encode_packed_f32(&[1.0, 0.0]),
            "v": encode_packed_f32(&[0.0, -2.0]),
        });
        assert!(decode_vectors(&content, 3).is_err());
    }
}
