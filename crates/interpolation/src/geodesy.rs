//! Great-circle geometry on a spherical earth.

use field_common::GeoPoint;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Calculate the Haversine distance between two points in meters.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1; NaN coordinates stay NaN.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Distance between two points in meters.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    haversine_distance(a.lat, a.lng, b.lat, b.lng)
}

/// Point at fraction `t` along the straight lat/lng segment from `a` to `b`.
///
/// Segments in a drawn path are short, so the planar blend is used instead of
/// a true great-circle midpoint.
pub fn lerp_point(a: GeoPoint, b: GeoPoint, t: f64) -> GeoPoint {
    GeoPoint::new(a.lat + (b.lat - a.lat) * t, a.lng + (b.lng - a.lng) * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_distance() {
        // London to Paris is about 344 km
        let distance_m = haversine_distance(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((distance_m / 1000.0 - 344.0).abs() < 5.0);
    }

    #[test]
    fn test_haversine_distance_same_point() {
        assert_eq!(haversine_distance(35.2, -97.5, 35.2, -97.5), 0.0);
    }

    #[test]
    fn test_haversine_distance_non_finite() {
        assert!(haversine_distance(f64::NAN, 0.0, 10.0, 10.0).is_nan());
        assert!(haversine_distance(0.0, 0.0, 10.0, f64::INFINITY).is_nan());
    }

    #[test]
    fn test_lerp_point_midpoint() {
        let mid = lerp_point(GeoPoint::new(0.0, 0.0), GeoPoint::new(2.0, 4.0), 0.5);
        assert_eq!(mid, GeoPoint::new(1.0, 2.0));
    }
}
