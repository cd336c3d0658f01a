//! Geofence test and distance formatting for alert banners.

use crate::{haversine_distance_meters, Coordinate};

/// Returns true when `a` and `b` are at most `threshold_meters` apart.
///
/// The threshold is inclusive: a worker exactly on the radius counts as
/// nearby.
#[inline]
pub fn is_within_proximity(a: &Coordinate, b: &Coordinate, threshold_meters: f64) -> bool {
    haversine_distance_meters(a, b) <= threshold_meters
}

/// Renders a distance for display.
///
/// Below one kilometer the value is rounded to whole meters (`"999m"`),
/// otherwise it is shown in kilometers with one decimal (`"1.5km"`).
/// Values that round up to 1000 m switch to the kilometer form so the output
/// never reads `"1000m"`. Negative or non-finite input renders as `"0m"`.
///
/// ```
/// use careline_geo::format_distance;
///
/// assert_eq!(format_distance(0.0), "0m");
/// assert_eq!(format_distance(999.0), "999m");
/// assert_eq!(format_distance(1000.0), "1.0km");
/// assert_eq!(format_distance(1500.0), "1.5km");
/// ```
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() || meters <= 0.0 {
        return "0m".to_string();
    }

    let rounded = meters.round();
    if rounded < 1000.0 {
        format!("{rounded:.0}m")
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}
