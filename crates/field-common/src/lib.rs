//! Common types and utilities shared across the field visualization crates.

pub mod bbox;
pub mod codec;
pub mod error;
pub mod geometry;
pub mod query;
pub mod snapshot;
pub mod viewport;

pub use bbox::BoundingBox;
pub use codec::{decode_packed_f32, decode_packed_values};
pub use error::{FieldError, FieldResult};
pub use geometry::{FeatureId, FeatureRecord, GeoPoint, Geometry};
pub use query::{QueryClient, QueryResponse};
pub use snapshot::{FieldSnapshot, VectorSample, VectorSnapshot};
pub use viewport::Viewport;
