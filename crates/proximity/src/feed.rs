//! Driving a monitor from a live-location subscription

use crate::monitor::ProximityMonitor;
use crate::sample::WorkerSample;
use crate::state::ProximitySnapshot;
use tokio::sync::mpsc;
use tracing::info;

/// Ingest samples in arrival order until the feed closes.
///
/// A closed channel means the feed is unavailable; the last known distance
/// is kept and the final snapshot is returned.
pub async fn drive_feed(
    monitor: &ProximityMonitor,
    samples: mpsc::Receiver<WorkerSample>,
) -> ProximitySnapshot {
    drive_feed_with(monitor, samples, |_| {}).await
}

/// Like [`drive_feed`], calling `on_update` with the snapshot after every sample
pub async fn drive_feed_with<F>(
    monitor: &ProximityMonitor,
    mut samples: mpsc::Receiver<WorkerSample>,
    mut on_update: F,
) -> ProximitySnapshot
where
    F: FnMut(&ProximitySnapshot),
{
    let mut received = 0usize;
    while let Some(sample) = samples.recv().await {
        received += 1;
        let snapshot = monitor.ingest_worker_coordinate(sample);
        on_update(&snapshot);
    }

    let snapshot = monitor.snapshot();
    info!(
        received,
        distance = snapshot.distance_formatted.as_deref().unwrap_or("unknown"),
        "Worker location feed closed"
    );
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MonitorPhase;
    use careline_geo::Coordinate;
    use careline_geocode::{
        BoxFuture, CoordinateResolver, GeocodeCache, GeocodeProvider, GeocodeResult, Result,
    };
    use std::sync::Arc;

    struct NoNetwork;

    impl GeocodeProvider for NoNetwork {
        fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<GeocodeResult>>> {
            panic!("unexpected lookup for {query}")
        }
    }

    async fn tracking_monitor() -> ProximityMonitor {
        let cache = Arc::new(GeocodeCache::new());
        cache.seed(
            "100 Queen St W, Toronto",
            GeocodeResult {
                coordinate: Coordinate::new(43.6532, -79.3832),
                display_name: "Toronto City Hall".to_string(),
            },
        );
        let resolver = CoordinateResolver::new(Arc::new(NoNetwork), cache);
        let monitor = ProximityMonitor::new(Arc::new(resolver));
        monitor.start("100 Queen St W, Toronto", 500.0).await;
        monitor
    }

    #[tokio::test]
    async fn test_feed_applies_in_order_and_keeps_last_distance() {
        let monitor = tracking_monitor().await;
        let (tx, rx) = mpsc::channel(8);

        tx.send(WorkerSample::new(Coordinate::new(43.6600, -79.3900))).await.unwrap();
        tx.send(WorkerSample::new(Coordinate::new(43.6540, -79.3840))).await.unwrap();
        drop(tx);

        let mut seen = Vec::new();
        let last = drive_feed_with(&monitor, rx, |s| seen.push(s.has_alerted)).await;

        assert_eq!(seen, [false, true]);
        assert_eq!(last.phase, MonitorPhase::Alerted);
        assert_eq!(last.distance_formatted.as_deref(), Some("110m"));
    }

    #[tokio::test]
    async fn test_closed_feed_without_samples() {
        let monitor = tracking_monitor().await;
        let (tx, rx) = mpsc::channel(1);
        drop(tx);

        let last = drive_feed(&monitor, rx).await;
        assert_eq!(last.phase, MonitorPhase::Tracking);
        assert!(last.distance_meters.is_none());
    }
}
