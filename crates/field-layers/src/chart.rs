//! Chart payloads and the trace arrays behind them.
//!
//! `TraceSet` holds what is currently plotted (one x axis, one y array per
//! trace) so CSV and workbook exporters can read it back.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use field_common::{FieldError, FieldResult, FieldSnapshot};
use interpolation::ProfilePoint;
use serde::Serialize;

/// Tabular payload for the charting surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPayload {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Option<f64>>>,
}

impl ChartPayload {
    /// `distance, value, lat, lng` rows of a profile.
    pub fn from_profile(points: &[ProfilePoint]) -> Self {
        Self {
            columns: ["distance", "value", "lat", "lng"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            data: points
                .iter()
                .map(|p| p.to_array().iter().map(|v| Some(*v)).collect())
                .collect(),
        }
    }
}

/// One named y series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub name: String,
    pub y: Vec<Option<f64>>,
}

/// The rendered x axis plus every trace plotted against it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceSet {
    pub x_label: String,
    pub x: Vec<f64>,
    pub traces: Vec<Trace>,
}

impl TraceSet {
    pub fn new(x_label: impl Into<String>, x: Vec<f64>) -> Self {
        Self {
            x_label: x_label.into(),
            x,
            traces: Vec::new(),
        }
    }

    /// Add a trace; it must have one y per x.
    pub fn add_trace(&mut self, name: impl Into<String>, y: Vec<Option<f64>>) -> FieldResult<()> {
        let name = name.into();
        if y.len() != self.x.len() {
            return Err(FieldError::Render(format!(
                "trace '{}' has {} values for {} x positions",
                name,
                y.len(),
                self.x.len()
            )));
        }
        self.traces.push(Trace { name, y });
        Ok(())
    }

    /// Profile chart: distance on x, the interpolated value as one trace.
    pub fn from_profile(name: impl Into<String>, points: &[ProfilePoint]) -> Self {
        Self {
            x_label: "distance_m".to_string(),
            x: points.iter().map(|p| p.distance).collect(),
            traces: vec![Trace {
                name: name.into(),
                y: points.iter().map(|p| Some(p.value)).collect(),
            }],
        }
    }

    /// Time series of one feature: Unix seconds on x, `None` where the
    /// feature has no data.
    pub fn point_series(
        name: impl Into<String>,
        snapshot: &FieldSnapshot,
        feature_index: usize,
    ) -> FieldResult<Self> {
        let mut y = Vec::with_capacity(snapshot.frame_count());
        for row in &snapshot.values_by_time {
            let value = row.get(feature_index).ok_or_else(|| {
                FieldError::InvalidSnapshot(format!(
                    "feature index {} out of range ({} features)",
                    feature_index,
                    row.len()
                ))
            })?;
            y.push(*value);
        }

        let mut set = Self::new("time", snapshot.timestamps.iter().map(unix_seconds).collect());
        set.add_trace(name, y)?;
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Tabular form for the charting surface: x then one column per trace.
    pub fn to_payload(&self) -> ChartPayload {
        let mut columns = vec![self.x_label.clone()];
        columns.extend(self.traces.iter().map(|t| t.name.clone()));

        let data = self
            .x
            .iter()
            .enumerate()
            .map(|(i, x)| {
                let mut row = vec![Some(*x)];
                row.extend(self.traces.iter().map(|t| t.y[i]));
                row
            })
            .collect();

        ChartPayload { columns, data }
    }

    /// CSV text: header row, then one row per x. Missing values are empty cells.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();

        let header: Vec<String> = std::iter::once(self.x_label.as_str())
            .chain(self.traces.iter().map(|t| t.name.as_str()))
            .map(csv_field)
            .collect();
        out.push_str(&header.join(","));
        out.push('\n');

        for (i, x) in self.x.iter().enumerate() {
            let _ = write!(out, "{}", x);
            for trace in &self.traces {
                out.push(',');
                if let Some(y) = trace.y[i].filter(|v| v.is_finite()) {
                    let _ = write!(out, "{}", y);
                }
            }
            out.push('\n');
        }
        out
    }
}

fn unix_seconds(ts: &DateTime<Utc>) -> f64 {
    ts.timestamp() as f64
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_quotes_header_fields() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("plain"), "plain");
    }

    #[test]
    fn test_add_trace_length_checked() {
        let mut set = TraceSet::new("x", vec![0.0, 1.0]);
        assert!(set.add_trace("short", vec![Some(1.0)]).is_err());
        assert!(set.add_trace("ok", vec![Some(1.0), None]).is_ok());
    }
}
