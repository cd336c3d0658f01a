//! Batch distance calculations with optional parallelism.
//!
//! Used to rank several workers' last known positions against one client
//! location, e.g. when a dispatcher picks who can reach a visit soonest.

use crate::{haversine_distance_meters, Coordinate};
use serde::{Deserialize, Serialize};

/// A worker's last known position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerLocation {
    /// Worker identifier
    pub id: String,
    /// Last known position
    pub coordinate: Coordinate,
}

/// Result of a distance calculation for a single worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceResult {
    /// The worker ID
    pub id: String,
    /// Distance in meters
    pub distance_meters: f64,
}

/// Calculate distances from `origin` to every worker with a valid position.
///
/// Workers whose coordinates are out of range are skipped.
///
/// # Example
/// ```
/// use careline_geo::{batch::{calculate_distances, WorkerLocation}, Coordinate};
///
/// let workers = vec![
///     WorkerLocation { id: "a".into(), coordinate: Coordinate::new(43.66, -79.39) },
///     WorkerLocation { id: "b".into(), coordinate: Coordinate::new(120.0, 0.0) },
/// ];
///
/// let results = calculate_distances(&Coordinate::new(43.6532, -79.3832), &workers);
/// assert_eq!(results.len(), 1);
/// ```
pub fn calculate_distances(origin: &Coordinate, workers: &[WorkerLocation]) -> Vec<DistanceResult> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        workers
            .par_iter()
            .filter_map(|worker| calculate_single_distance(origin, worker))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        workers
            .iter()
            .filter_map(|worker| calculate_single_distance(origin, worker))
            .collect()
    }
}

/// Calculate distances and return workers sorted closest first.
///
/// `max_results` of `None` returns every worker with a valid position.
pub fn rank_by_distance(
    origin: &Coordinate,
    workers: &[WorkerLocation],
    max_results: Option<usize>,
) -> Vec<DistanceResult> {
    let mut results = calculate_distances(origin, workers);
    sort_by_distance(&mut results);

    if let Some(max) = max_results {
        results.truncate(max);
    }

    results
}

/// Workers within `radius_meters` (inclusive) of `origin`, closest first.
pub fn within_radius(
    origin: &Coordinate,
    workers: &[WorkerLocation],
    radius_meters: f64,
) -> Vec<DistanceResult> {
    let mut results = calculate_distances(origin, workers);
    results.retain(|r| r.distance_meters <= radius_meters);
    sort_by_distance(&mut results);
    results
}

fn sort_by_distance(results: &mut [DistanceResult]) {
    results.sort_by(|a, b| {
        a.distance_meters
            .total_cmp(&b.distance_meters)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[inline]
fn calculate_single_distance(origin: &Coordinate, worker: &WorkerLocation) -> Option<DistanceResult> {
    worker.coordinate.is_valid().then(|| DistanceResult {
        id: worker.id.clone(),
        distance_meters: haversine_distance_meters(origin, &worker.coordinate),
    })
}
