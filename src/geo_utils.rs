//! # Geographic Utilities
//!
//! Great-circle geodesy for GPS fixes.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points |
//! | [`is_within_distance`] | Whether two points lie within a radius of each other |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//!
//! ## Example
//!
//! ```rust
//! use cyclefog_engine::{GeoPoint, geo_utils};
//!
//! let berlin = GeoPoint::new(52.5200, 13.4050);
//! let paris = GeoPoint::new(48.8566, 2.3522);
//!
//! let dist = geo_utils::haversine_distance(&berlin, &paris);
//! assert!((dist - 878_000.0).abs() < 8_780.0); // ~878 km, within 1%
//! ```
//!
//! ## Haversine Formula
//!
//! Distances assume a spherical Earth of radius [`EARTH_RADIUS_METERS`]. The
//! haversine form is well conditioned for the short hops between consecutive
//! GPS fixes as well as for city-to-city distances.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)

use geo::{Distance, Haversine, Point};

use crate::GeoPoint;

/// Sphere radius used for all distances, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Radius `geo::Haversine` measures on (IUGG mean Earth radius).
const GEO_MEAN_RADIUS_METERS: f64 = 6_371_008.8;

/// Great-circle distance between two points in meters.
///
/// Symmetric, never negative, and exactly zero for identical points. All
/// finite inputs are accepted.
///
/// # Example
///
/// ```rust
/// use cyclefog_engine::{GeoPoint, geo_utils};
///
/// let a = GeoPoint::new(51.5074, -0.1278);
/// let b = GeoPoint::new(51.5080, -0.1290);
/// assert_eq!(geo_utils::haversine_distance(&a, &a), 0.0);
/// assert_eq!(
///     geo_utils::haversine_distance(&a, &b),
///     geo_utils::haversine_distance(&b, &a),
/// );
/// ```
#[inline]
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2) * (EARTH_RADIUS_METERS / GEO_MEAN_RADIUS_METERS)
}

/// True if `p1` and `p2` are at most `max_distance_meters` apart.
#[inline]
pub fn is_within_distance(p1: &GeoPoint, p2: &GeoPoint, max_distance_meters: f64) -> bool {
    haversine_distance(p1, p2) <= max_distance_meters
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses the longitude scale at `latitude`, which is the larger of the two
/// axes. Near the poles the scale is floored at 10% of the equatorial value,
/// so above ~84.3° the result underestimates the longitude span; it is meant
/// for display scales, not for search padding.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = 111_320.0 * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GeoPoint::new(52.5200, 13.4050);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_distance_symmetric() {
        let a = GeoPoint::new(52.5200, 13.4050);
        let b = GeoPoint::new(-33.8688, 151.2093);
        assert_eq!(haversine_distance(&a, &b), haversine_distance(&b, &a));
    }

    #[test]
    fn test_haversine_distance_berlin_paris() {
        let berlin = GeoPoint::new(52.5200, 13.4050);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let dist = haversine_distance(&berlin, &paris);
        assert!(approx_eq(dist, 878_000.0, 8_780.0));
    }

    #[test]
    fn test_haversine_distance_amsterdam_paris() {
        let amsterdam = GeoPoint::new(52.3676, 4.9041);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let dist = haversine_distance(&amsterdam, &paris);
        assert!(approx_eq(dist, 430_000.0, 4_300.0));
    }

    #[test]
    fn test_quarter_meridian_uses_sphere_radius() {
        let equator = GeoPoint::new(0.0, 0.0);
        let pole = GeoPoint::new(90.0, 0.0);
        let expected = EARTH_RADIUS_METERS * std::f64::consts::FRAC_PI_2;
        assert!(approx_eq(haversine_distance(&equator, &pole), expected, 1.0));
    }

    #[test]
    fn test_is_within_distance() {
        let a = GeoPoint::new(52.5200, 13.4050);
        let b = GeoPoint::new(52.5230, 13.4050); // ~334m north
        assert!(is_within_distance(&a, &b, 500.0));
        assert!(!is_within_distance(&a, &b, 300.0));
    }

    #[test]
    fn test_meters_to_degrees() {
        let deg = meters_to_degrees(111_320.0, 0.0);
        assert!(approx_eq(deg, 1.0, 0.01));

        let deg_60 = meters_to_degrees(111_320.0, 60.0);
        assert!(approx_eq(deg_60, 2.0, 0.01));
    }
}
