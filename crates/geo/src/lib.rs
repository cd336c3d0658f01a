//! Distance engine for caregiver proximity alerts.
//!
//! This crate provides:
//! - Haversine distance calculations, numerically stable up to antipodes
//! - Inclusive proximity (geofence) tests
//! - Human-readable distance strings for alert banners
//! - Canadian postal code parsing and FSA extraction
//! - Batch ranking of many workers against one location
//!
//! # Example
//!
//! ```
//! use careline_geo::{format_distance, haversine_distance_meters, is_within_proximity, Coordinate};
//!
//! let client = Coordinate::new(43.6532, -79.3832); // Toronto City Hall
//! let worker = Coordinate::new(43.6540, -79.3840);
//!
//! let meters = haversine_distance_meters(&client, &worker);
//! assert!(is_within_proximity(&client, &worker, 500.0));
//! assert_eq!(format_distance(meters), "110m");
//! ```

mod error;
mod haversine;
pub mod batch;
pub mod postal;
mod proximity;

pub use batch::{rank_by_distance, within_radius, DistanceResult, WorkerLocation};
pub use error::{GeoError, Result};
pub use haversine::{
    approximate_distance, haversine_distance, haversine_distance_meters, EARTH_RADIUS_KM,
    EARTH_RADIUS_M,
};
pub use postal::PostalCode;
pub use proximity::{format_distance, is_within_proximity};

use std::fmt;
use std::str::FromStr;

/// A geographic coordinate with latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate without range checks.
    ///
    /// # Arguments
    /// * `latitude` - Latitude in degrees (-90 to 90)
    /// * `longitude` - Longitude in degrees (-180 to 180)
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Creates a coordinate, rejecting values outside the valid range.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self> {
        let coord = Self::new(latitude, longitude);
        if coord.is_valid() {
            Ok(coord)
        } else {
            Err(GeoError::InvalidCoordinate(format!("({latitude}, {longitude})")))
        }
    }

    /// Returns true if the coordinate has valid values.
    ///
    /// NaN fails every comparison, so it is rejected too.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Converts degrees to radians for internal calculations.
    #[inline]
    pub(crate) fn to_radians(self) -> (f64, f64) {
        (self.latitude.to_radians(), self.longitude.to_radians())
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Parses `"lat,lon"` (whitespace around either number is ignored).
impl FromStr for Coordinate {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || GeoError::InvalidCoordinate(s.to_string());

        let (lat, lon) = s.split_once(',').ok_or_else(invalid)?;
        let latitude = lat.trim().parse::<f64>().map_err(|_| invalid())?;
        let longitude = lon.trim().parse::<f64>().map_err(|_| invalid())?;
        Self::try_new(latitude, longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_creation() {
        let coord = Coordinate::new(43.6532, -79.3832);
        assert_eq!(coord.latitude, 43.6532);
        assert_eq!(coord.longitude, -79.3832);
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(0.0, 0.0).is_valid());
        assert!(Coordinate::new(90.0, 180.0).is_valid());
        assert!(Coordinate::new(-90.0, -180.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_try_new_rejects_out_of_range() {
        assert!(Coordinate::try_new(43.0, -79.0).is_ok());
        assert!(matches!(
            Coordinate::try_new(-95.0, 0.0),
            Err(GeoError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn test_coordinate_from_tuple() {
        let coord: Coordinate = (43.6532, -79.3832).into();
        assert_eq!(coord.latitude, 43.6532);
    }

    #[test]
    fn test_coordinate_from_str() {
        let coord: Coordinate = "43.6532, -79.3832".parse().unwrap();
        assert_eq!(coord, Coordinate::new(43.6532, -79.3832));

        assert!("43.6532".parse::<Coordinate>().is_err());
        assert!("north,west".parse::<Coordinate>().is_err());
        assert!("100,0".parse::<Coordinate>().is_err());
    }
}
