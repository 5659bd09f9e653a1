//! Live visual layers for one scalar field and at most one vector field.
//!
//! - Scalar layer: geometry → color binding with a per-feature color cache so
//!   only features whose color changed are repainted
//! - Vector layer: arrow glyphs drawn on a raster sized to the viewport
//! - Hover / click hit-testing that emits raw features to host callbacks
//! - Chart payloads and trace sets for profile and point series export

pub mod cache;
pub mod chart;
pub mod engine;
pub mod events;
pub mod scalar;
pub mod surface;
pub mod vector;
pub mod viewport;

pub use cache::FeatureColorCache;
pub use chart::{ChartPayload, Trace, TraceSet};
pub use engine::{EngineOptions, FieldLayerEngine};
pub use events::{FeatureEvent, FeatureEvents};
pub use scalar::{ScalarLayer, UpdateStats};
pub use surface::{LegendWidget, MapSurface};
pub use vector::{VectorLayer, VectorStats};
pub use viewport::{Viewport, ViewportWatch};
