//! Worker location samples as delivered by the live-location feed

use careline_geo::Coordinate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One position report from a worker's device.
///
/// Serialized as the feed's `{latitude, longitude, timestamp}` tuple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkerSample {
    /// Reported position
    #[serde(flatten)]
    pub coordinate: Coordinate,
    /// When the device recorded the position, if the feed provides it
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl WorkerSample {
    /// A sample without a timestamp; applied in delivery order
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            recorded_at: None,
        }
    }

    /// A sample recorded at `recorded_at`
    pub fn at(coordinate: Coordinate, recorded_at: DateTime<Utc>) -> Self {
        Self {
            coordinate,
            recorded_at: Some(recorded_at),
        }
    }
}

impl From<Coordinate> for WorkerSample {
    fn from(coordinate: Coordinate) -> Self {
        Self::new(coordinate)
    }
}
