//! Proximity monitor: one watch of a worker against a client's address

use crate::sample::WorkerSample;
use crate::state::{ProximitySnapshot, ProximityState, SampleOutcome, SampleRejection};
use careline_core::config::ProximitySection;
use careline_geocode::cache::normalize_key;
use careline_geocode::CoordinateResolver;
use careline_telemetry::{metrics, names};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Radius used when a caller passes an unusable threshold
pub const DEFAULT_THRESHOLD_METERS: f64 = 500.0;

/// Monitor configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    /// Fallback for non-positive or non-finite thresholds
    pub default_threshold_meters: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            default_threshold_meters: DEFAULT_THRESHOLD_METERS,
        }
    }
}

impl MonitorConfig {
    /// Build from the `[proximity]` section of `careline.toml`
    #[must_use]
    pub fn from_section(section: &ProximitySection) -> Self {
        Self {
            default_threshold_meters: section.threshold_meters,
        }
    }

    fn effective_threshold(&self, requested: f64) -> f64 {
        if requested.is_finite() && requested > 0.0 {
            requested
        } else {
            self.default_threshold_meters
        }
    }
}

/// Watches a worker's position against a client's address and raises a
/// one-shot arrival alert.
///
/// Samples are ingested synchronously. The only suspension point is the
/// address lookup in [`ProximityMonitor::start`], and the state lock is
/// never held across it: each session carries a generation token, and a
/// lookup that finishes after its session was replaced or stopped is
/// discarded.
pub struct ProximityMonitor {
    resolver: Arc<CoordinateResolver>,
    config: MonitorConfig,
    state: Mutex<ProximityState>,
}

impl ProximityMonitor {
    /// Create a monitor with the default configuration
    pub fn new(resolver: Arc<CoordinateResolver>) -> Self {
        Self::with_config(resolver, MonitorConfig::default())
    }

    /// Create a monitor with a specific configuration
    pub fn with_config(resolver: Arc<CoordinateResolver>, config: MonitorConfig) -> Self {
        Self {
            resolver,
            config,
            state: Mutex::new(ProximityState::new(config.default_threshold_meters)),
        }
    }

    /// The resolver used for target addresses
    #[must_use]
    pub fn resolver(&self) -> &CoordinateResolver {
        &self.resolver
    }

    /// Start watching `target_address`.
    ///
    /// Calling this again for the address already being watched only
    /// updates the threshold. Any other address opens a new session and
    /// resolves it; the returned snapshot reflects the outcome (`Tracking`
    /// on success, `Idle` when the address could not be resolved) unless
    /// the session was superseded while resolving.
    pub async fn start(&self, target_address: &str, threshold_meters: f64) -> ProximitySnapshot {
        let threshold = self.config.effective_threshold(threshold_meters);
        let key = normalize_key(target_address);

        let generation = {
            let mut state = self.lock();
            if state.is_watching(&key) {
                debug!(address = %key, threshold, "Session already open, updating threshold");
                if let Some(outcome) = state.set_threshold(threshold) {
                    record_outcome(outcome);
                }
                return state.snapshot();
            }
            state.begin_session(key.clone(), threshold)
        };
        info!(address = %key, threshold, generation, "Starting proximity session");

        let resolution = self.resolver.resolve(target_address).await;
        let found = resolution.is_found();

        let mut state = self.lock();
        if state.apply_resolution(generation, resolution) {
            if found {
                info!(address = %key, generation, "Target resolved, tracking worker");
            } else {
                info!(address = %key, generation, "Target not found, proximity alerts disabled");
            }
        } else {
            debug!(
                address = %key,
                generation,
                current = state.generation(),
                "Discarding resolution for superseded session"
            );
            metrics().increment(names::PROXIMITY_STALE_RESOLUTIONS);
        }
        state.snapshot()
    }

    /// Apply a worker position sample.
    ///
    /// Ignored unless a target is being tracked. Out-of-range coordinates
    /// and samples older than the last applied one are dropped.
    pub fn ingest_worker_coordinate(&self, sample: WorkerSample) -> ProximitySnapshot {
        let mut state = self.lock();
        let outcome = state.ingest(sample);
        record_outcome(outcome);
        state.snapshot()
    }

    /// End the session. A later [`ProximityMonitor::start`] begins afresh.
    pub fn stop(&self) -> ProximitySnapshot {
        let mut state = self.lock();
        state.stop();
        info!(generation = state.generation(), "Proximity session stopped");
        state.snapshot()
    }

    /// Current observable state
    #[must_use]
    pub fn snapshot(&self) -> ProximitySnapshot {
        self.lock().snapshot()
    }

    fn lock(&self) -> MutexGuard<'_, ProximityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn record_outcome(outcome: SampleOutcome) {
    match outcome {
        SampleOutcome::Arrived { distance_meters } => {
            info!(distance_meters, "Caregiver entered proximity radius");
            metrics().increment(names::PROXIMITY_ALERTS);
        }
        SampleOutcome::Updated { distance_meters } => {
            debug!(distance_meters, "Worker distance updated");
        }
        SampleOutcome::Rejected(SampleRejection::Stale) => {
            debug!("Dropping out-of-order worker sample");
            metrics().increment(names::PROXIMITY_STALE_SAMPLES);
        }
        SampleOutcome::Rejected(SampleRejection::InvalidCoordinate) => {
            debug!("Dropping worker sample with invalid coordinate");
        }
        SampleOutcome::Rejected(SampleRejection::NotTracking) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MonitorPhase;
    use careline_geo::Coordinate;
    use careline_geocode::{BoxFuture, GeocodeCache, GeocodeProvider, GeocodeResult, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TARGET: Coordinate = Coordinate::new(43.6532, -79.3832);

    struct CountingProvider {
        calls: AtomicUsize,
        found: bool,
    }

    impl GeocodeProvider for CountingProvider {
        fn search<'a>(&'a self, _query: &'a str) -> BoxFuture<'a, Result<Vec<GeocodeResult>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let places = if self.found {
                vec![GeocodeResult {
                    coordinate: TARGET,
                    display_name: "Toronto City Hall".to_string(),
                }]
            } else {
                Vec::new()
            };
            Box::pin(async move { Ok(places) })
        }
    }

    fn monitor(found: bool) -> (ProximityMonitor, Arc<CountingProvider>) {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            found,
        });
        let resolver = CoordinateResolver::new(provider.clone(), Arc::new(GeocodeCache::new()));
        (ProximityMonitor::new(Arc::new(resolver)), provider)
    }

    fn near() -> WorkerSample {
        WorkerSample::new(Coordinate::new(43.6540, -79.3840))
    }

    fn far() -> WorkerSample {
        WorkerSample::new(Coordinate::new(43.6600, -79.3900))
    }

    #[tokio::test]
    async fn test_start_resolves_to_tracking() {
        let (monitor, _) = monitor(true);
        let snapshot = monitor.start("100 Queen St W, Toronto", 500.0).await;

        assert_eq!(snapshot.phase, MonitorPhase::Tracking);
        assert_eq!(snapshot.target_coordinate, Some(TARGET));
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_unresolvable_target_disables_alerts() {
        let (monitor, _) = monitor(false);
        let snapshot = monitor.start("RR 2, Nowhere", 500.0).await;

        assert_eq!(snapshot.phase, MonitorPhase::Idle);
        assert!(snapshot.target_coordinate.is_none());

        let snapshot = monitor.ingest_worker_coordinate(near());
        assert!(!snapshot.has_alerted);
        assert!(snapshot.distance_meters.is_none());
    }

    #[tokio::test]
    async fn test_samples_ignored_before_start() {
        let (monitor, _) = monitor(true);
        let snapshot = monitor.ingest_worker_coordinate(near());

        assert_eq!(snapshot.phase, MonitorPhase::Idle);
        assert!(snapshot.distance_meters.is_none());
    }

    #[tokio::test]
    async fn test_start_is_idempotent_for_same_target() {
        let (monitor, provider) = monitor(true);
        monitor.start("100 Queen St W, Toronto", 500.0).await;
        monitor.ingest_worker_coordinate(far());

        let snapshot = monitor.start("  100 queen st w, toronto", 500.0).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot.phase, MonitorPhase::Tracking);
        assert!(snapshot.distance_meters.is_some());
    }

    #[tokio::test]
    async fn test_restart_updates_threshold_in_place() {
        let (monitor, _) = monitor(true);
        monitor.start("100 Queen St W, Toronto", 500.0).await;
        let snapshot = monitor.ingest_worker_coordinate(far());
        assert!(!snapshot.has_alerted);

        let snapshot = monitor.start("100 Queen St W, Toronto", 1_000.0).await;

        assert!(snapshot.has_alerted);
        assert!(snapshot.is_within_threshold);
        assert_eq!(snapshot.phase, MonitorPhase::Alerted);
    }

    #[tokio::test]
    async fn test_invalid_threshold_uses_default() {
        let (monitor, _) = monitor(true);
        monitor.start("100 Queen St W, Toronto", -5.0).await;

        // ~110 m is inside the 500 m default
        assert!(monitor.ingest_worker_coordinate(near()).has_alerted);

        monitor.stop();
        monitor.start("100 Queen St W, Toronto", f64::NAN).await;
        assert!(!monitor.ingest_worker_coordinate(far()).has_alerted);
    }

    #[tokio::test]
    async fn test_stop_then_start_begins_fresh() {
        let (monitor, provider) = monitor(true);
        monitor.start("100 Queen St W, Toronto", 500.0).await;
        assert!(monitor.ingest_worker_coordinate(near()).has_alerted);

        let stopped = monitor.stop();
        assert_eq!(stopped.phase, MonitorPhase::Stopped);
        assert!(!stopped.has_alerted);

        let snapshot = monitor.start("100 Queen St W, Toronto", 500.0).await;
        assert_eq!(snapshot.phase, MonitorPhase::Tracking);
        assert!(!snapshot.has_alerted);
        assert!(snapshot.distance_meters.is_none());

        // Second session is served from the cache
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_alert_counter() {
        let (monitor, _) = monitor(true);
        let before = metrics().counter(names::PROXIMITY_ALERTS);

        monitor.start("100 Queen St W, Toronto", 500.0).await;
        monitor.ingest_worker_coordinate(far());
        monitor.ingest_worker_coordinate(near());
        monitor.ingest_worker_coordinate(near());

        assert!(metrics().counter(names::PROXIMITY_ALERTS) > before);
    }

    #[test]
    fn test_config_from_section() {
        let section = ProximitySection {
            threshold_meters: 250.0,
            ..ProximitySection::default()
        };
        let config = MonitorConfig::from_section(&section);

        assert_eq!(config.default_threshold_meters, 250.0);
        assert_eq!(config.effective_threshold(0.0), 250.0);
        assert_eq!(config.effective_threshold(f64::INFINITY), 250.0);
        assert_eq!(config.effective_threshold(75.0), 75.0);
    }
}
