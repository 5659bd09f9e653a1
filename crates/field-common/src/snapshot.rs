//! Field snapshots returned by the backend query interface.
//!
//! A snapshot is immutable once received and superseded wholesale on re-query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FieldResult};

/// Scalar field over all timestamps, one value slot per feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub timestamps: Vec<DateTime<Utc>>,
    /// `values_by_time[t][feature_index]`
    pub values_by_time: Vec<Vec<Option<f64>>>,
}

impl FieldSnapshot {
    /// Build a snapshot, checking that every timestamp has a value row of equal width.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        values_by_time: Vec<Vec<Option<f64>>>,
    ) -> FieldResult<Self> {
        let snapshot = Self {
            timestamps,
            values_by_time,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> FieldResult<()> {
        if self.timestamps.len() != self.values_by_time.len() {
            return Err(FieldError::InvalidSnapshot(format!(
                "{} timestamps but {} value rows",
                self.timestamps.len(),
                self.values_by_time.len()
            )));
        }
        if let Some(first) = self.values_by_time.first() {
            let width = first.len();
            if let Some(pos) = self.values_by_time.iter().position(|row| row.len() != width) {
                return Err(FieldError::InvalidSnapshot(format!(
                    "value row {} has {} entries, expected {}",
                    pos,
                    self.values_by_time[pos].len(),
                    width
                )));
            }
        }
        Ok(())
    }

    /// Number of time steps.
    pub fn frame_count(&self) -> usize {
        self.timestamps.len()
    }

    /// Values of every feature at a time index.
    pub fn values_at(&self, index: usize) -> FieldResult<&[Option<f64>]> {
        self.values_by_time
            .get(index)
            .map(Vec::as_slice)
            .ok_or(FieldError::FrameOutOfRange {
                index,
                count: self.frame_count(),
            })
    }

    /// Finite min/max over all timestamps. `None` if no finite value exists.
    pub fn global_range(&self) -> Option<(f64, f64)> {
        finite_range(self.values_by_time.iter().flatten().filter_map(|v| *v))
    }
}

/// One arrow sample of a vector field: position, components and color source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorSample {
    /// Longitude
    pub x: f64,
    /// Latitude
    pub y: f64,
    pub u: f64,
    pub v: f64,
    /// Value used for coloring; speed when absent.
    #[serde(default)]
    pub magnitude: Option<f64>,
}

impl VectorSample {
    pub fn new(x: f64, y: f64, u: f64, v: f64) -> Self {
        Self {
            x,
            y,
            u,
            v,
            magnitude: None,
        }
    }

    /// Value fed to the color mapper for this arrow.
    pub fn color_source(&self) -> f64 {
        self.magnitude.unwrap_or_else(|| self.u.hypot(self.v))
    }
}

/// Vector field over all timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSnapshot {
    pub timestamps: Vec<DateTime<Utc>>,
    pub frames: Vec<Vec<VectorSample>>,
}

impl VectorSnapshot {
    pub fn frame_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn frame(&self, index: usize) -> FieldResult<&[VectorSample]> {
        self.frames
            .get(index)
            .map(Vec::as_slice)
            .ok_or(FieldError::FrameOutOfRange {
                index,
                count: self.frame_count(),
            })
    }

    /// Finite min/max of the color source over all frames.
    pub fn magnitude_range(&self) -> Option<(f64, f64)> {
        finite_range(self.frames.iter().flatten().map(VectorSample::color_source))
    }
}

fn finite_range<I: Iterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
