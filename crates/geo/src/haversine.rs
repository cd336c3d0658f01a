//! Haversine distance calculation.
//!
//! The Haversine formula calculates the great-circle distance between two points
//! on a sphere given their longitudes and latitudes.

use crate::Coordinate;

/// Earth's mean radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Earth's mean radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculates the great-circle distance between two coordinates in kilometers.
///
/// # Example
/// ```
/// use careline_geo::{haversine_distance, Coordinate};
///
/// let toronto = Coordinate::new(43.6532, -79.3832);
/// let ottawa = Coordinate::new(45.4215, -75.6972);
///
/// let distance = haversine_distance(&toronto, &ottawa);
/// assert!((distance - 352.0).abs() < 5.0);
/// ```
#[inline]
pub fn haversine_distance(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine_distance_with_radius(from, to, EARTH_RADIUS_KM)
}

/// Calculates the great-circle distance between two coordinates in meters.
///
/// Pure and deterministic; symmetric in its arguments and zero for
/// identical points.
#[inline]
pub fn haversine_distance_meters(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine_distance_with_radius(from, to, EARTH_RADIUS_M)
}

#[inline]
fn haversine_distance_with_radius(from: &Coordinate, to: &Coordinate, radius: f64) -> f64 {
    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    // Rounding can push `a` a hair past 1 near antipodes
    let a = a.clamp(0.0, 1.0);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    radius * c
}

/// Fast approximate distance for filtering (uses equirectangular projection).
///
/// Faster than Haversine but less accurate over long distances. Returns
/// kilometers.
#[inline]
pub fn approximate_distance(from: &Coordinate, to: &Coordinate) -> f64 {
    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();

    let x = (lon2 - lon1) * ((lat1 + lat2) / 2.0).cos();
    let y = lat2 - lat1;

    (x * x + y * y).sqrt() * EARTH_RADIUS_KM
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TORONTO: Coordinate = Coordinate { latitude: 43.6532, longitude: -79.3832 };
    const OTTAWA: Coordinate = Coordinate { latitude: 45.4215, longitude: -75.6972 };
    const VANCOUVER: Coordinate = Coordinate { latitude: 49.2827, longitude: -123.1207 };

    #[test]
    fn test_toronto_to_ottawa() {
        let distance = haversine_distance(&TORONTO, &OTTAWA);
        // Expected: ~352 km
        assert!((distance - 352.0).abs() < 5.0, "Toronto-Ottawa: {}", distance);
    }

    #[test]
    fn test_toronto_to_vancouver() {
        let distance = haversine_distance(&TORONTO, &VANCOUVER);
        // Expected: ~3,358 km
        assert!((distance - 3358.0).abs() < 20.0, "Toronto-Vancouver: {}", distance);
    }

    #[test]
    fn test_same_point_zero_distance() {
        assert_eq!(haversine_distance_meters(&TORONTO, &TORONTO), 0.0);
    }

    #[test]
    fn test_meters_conversion() {
        let km = haversine_distance(&TORONTO, &OTTAWA);
        let meters = haversine_distance_meters(&TORONTO, &OTTAWA);
        assert!((meters - km * 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_antipodal_points_are_stable() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 180.0);
        let distance = haversine_distance_meters(&a, &b);

        assert!(distance.is_finite());
        // Half the circumference: pi * R
        assert!((distance - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
        assert!((distance - 20_015_000.0).abs() < 1_000.0);
    }

    #[test]
    fn test_pole_to_pole() {
        let north = Coordinate::new(90.0, 0.0);
        let south = Coordinate::new(-90.0, 45.0);
        let distance = haversine_distance_meters(&north, &south);
        assert!((distance - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }

    #[test]
    fn test_approximate_distance_reasonable() {
        let exact = haversine_distance(&TORONTO, &OTTAWA);
        let approx = approximate_distance(&TORONTO, &OTTAWA);
        let error = ((approx - exact) / exact).abs();
        assert!(error < 0.05, "Error: {}%", error * 100.0);
    }

    fn coordinate() -> impl Strategy<Value = Coordinate> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lon)| Coordinate::new(lat, lon))
    }

    proptest! {
        #[test]
        fn prop_symmetric(a in coordinate(), b in coordinate()) {
            let ab = haversine_distance_meters(&a, &b);
            let ba = haversine_distance_meters(&b, &a);
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        #[test]
        fn prop_identity_is_zero(a in coordinate()) {
            prop_assert_eq!(haversine_distance_meters(&a, &a), 0.0);
        }

        #[test]
        fn prop_bounded_by_half_circumference(a in coordinate(), b in coordinate()) {
            let d = haversine_distance_meters(&a, &b);
            prop_assert!(d.is_finite());
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_M + 1e-3);
        }
    }
}
