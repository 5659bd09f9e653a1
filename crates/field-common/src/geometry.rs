//! Feature geometry for mesh cells and observation points.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// Identifier of a mesh cell or observation cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub u64);

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Geometry of a feature: a polygon ring (lon/lat order irrelevant to callers)
/// or a single point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates", rename_all = "snake_case")]
pub enum Geometry {
    Point(GeoPoint),
    Polygon(Vec<GeoPoint>),
}

impl Geometry {
    /// Centroid used as the sample location for interpolation.
    ///
    /// Polygons use the vertex average; an empty ring yields `None`.
    pub fn centroid(&self) -> Option<GeoPoint> {
        match self {
            Geometry::Point(p) => Some(*p),
            Geometry::Polygon(ring) => {
                if ring.is_empty() {
                    return None;
                }
                let n = ring.len() as f64;
                let (lat, lng) = ring
                    .iter()
                    .fold((0.0, 0.0), |(la, ln), p| (la + p.lat, ln + p.lng));
                Some(GeoPoint::new(lat / n, lng / n))
            }
        }
    }

    /// Bounding box of the geometry.
    pub fn bbox(&self) -> Option<BoundingBox> {
        match self {
            Geometry::Point(p) => Some(BoundingBox::new(p.lng, p.lat, p.lng, p.lat)),
            Geometry::Polygon(ring) => BoundingBox::enclosing(ring.iter().map(|p| (p.lng, p.lat))),
        }
    }

    /// Check if a point is inside the polygon using ray casting algorithm.
    ///
    /// Point geometries never contain anything; callers hit-test them by distance.
    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        let ring = match self {
            Geometry::Polygon(ring) => ring,
            Geometry::Point(_) => return false,
        };
        let n = ring.len();
        if n < 3 || !self.bbox().is_some_and(|b| b.contains_point(lng, lat)) {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;

        for i in 0..n {
            let (xi, yi) = (ring[i].lng, ring[i].lat);
            let (xj, yj) = (ring[j].lng, ring[j].lat);

            if ((yi > lat) != (yj > lat)) && (lng < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }

        inside
    }
}

/// One mesh cell / observation cell of a scalar field.
///
/// `current_value` is mutated in place every frame; `None` means no data at
/// the current time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub id: FeatureId,
    pub geometry: Geometry,
    #[serde(default)]
    pub current_value: Option<f64>,
}

impl FeatureRecord {
    pub fn new(id: u64, geometry: Geometry) -> Self {
        Self {
            id: FeatureId(id),
            geometry,
            current_value: None,
        }
    }
}
