//! Spatial interpolation over sparse scalar samples.
//!
//! - Great-circle distances
//! - Inverse-distance-weighted (IDW) point interpolation
//! - Polyline resampling into distance-ordered profiles

pub mod geodesy;
pub mod idw;
pub mod profile;

pub use geodesy::haversine_distance;
pub use idw::{interpolate, IdwOptions, Sample};
pub use profile::{resample_polyline, PathVertex, ProfilePoint};
