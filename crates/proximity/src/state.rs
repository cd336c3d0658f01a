//! Session state for one caregiver-to-client proximity watch
//!
//! Everything here is synchronous; the monitor wraps [`ProximityState`] in a
//! mutex and only awaits outside of it.

use crate::sample::WorkerSample;
use careline_geo::{format_distance, haversine_distance_meters, Coordinate};
use careline_geocode::Resolution;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorPhase {
    /// No usable target: never started, or the address did not resolve
    #[default]
    Idle,
    /// Waiting for the target address to resolve
    Resolving,
    /// Target known, worker not yet inside the radius
    Tracking,
    /// Worker has entered the radius during this session
    Alerted,
    /// Session ended by the caller
    Stopped,
}

impl MonitorPhase {
    /// True while samples are being applied
    #[must_use]
    pub fn accepts_samples(self) -> bool {
        matches!(self, Self::Tracking | Self::Alerted)
    }

    /// True while a session for some target is open
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Resolving | Self::Tracking | Self::Alerted)
    }
}

impl fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Tracking => "tracking",
            Self::Alerted => "alerted",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// What the presentation layer sees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximitySnapshot {
    /// Worker is currently inside the radius
    pub is_within_threshold: bool,
    /// Latest worker-to-target distance
    pub distance_meters: Option<f64>,
    /// `distance_meters` rendered for display ("110m", "1.5km")
    pub distance_formatted: Option<String>,
    /// Worker has entered the radius at least once this session
    pub has_alerted: bool,
    /// Target address is still resolving
    pub is_loading: bool,
    /// Resolved target, if any
    pub target_coordinate: Option<Coordinate>,
    /// Current phase
    pub phase: MonitorPhase,
}

/// Why a sample was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRejection {
    /// No target is being tracked
    NotTracking,
    /// Coordinate out of range or NaN
    InvalidCoordinate,
    /// Recorded before the last applied sample
    Stale,
}

/// Result of applying a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// Distance updated
    Updated {
        /// New distance
        distance_meters: f64,
    },
    /// Distance updated and the worker just crossed into the radius
    Arrived {
        /// New distance
        distance_meters: f64,
    },
    /// Sample dropped
    Rejected(SampleRejection),
}

/// Mutable state of a monitor
#[derive(Debug, Clone)]
pub struct ProximityState {
    target_address: Option<String>,
    target_coordinate: Option<Coordinate>,
    threshold_meters: f64,
    last_worker_coordinate: Option<Coordinate>,
    last_sample_at: Option<DateTime<Utc>>,
    distance_meters: Option<f64>,
    is_within_threshold: bool,
    has_alerted: bool,
    phase: MonitorPhase,
    generation: u64,
}

impl ProximityState {
    /// Fresh state in [`MonitorPhase::Idle`]
    pub fn new(threshold_meters: f64) -> Self {
        Self {
            target_address: None,
            target_coordinate: None,
            threshold_meters,
            last_worker_coordinate: None,
            last_sample_at: None,
            distance_meters: None,
            is_within_threshold: false,
            has_alerted: false,
            phase: MonitorPhase::Idle,
            generation: 0,
        }
    }

    /// Current phase
    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    /// Current session token
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Active radius
    pub fn threshold_meters(&self) -> f64 {
        self.threshold_meters
    }

    /// Last applied worker position
    pub fn last_worker_coordinate(&self) -> Option<Coordinate> {
        self.last_worker_coordinate
    }

    /// True if a session for `address_key` is open
    pub fn is_watching(&self, address_key: &str) -> bool {
        self.phase.is_active() && self.target_address.as_deref() == Some(address_key)
    }

    /// Open a new session, returning its generation.
    ///
    /// Every session field is reset, so `has_alerted` starts false.
    pub fn begin_session(&mut self, address_key: String, threshold_meters: f64) -> u64 {
        self.clear_session();
        self.generation += 1;
        self.target_address = Some(address_key);
        self.threshold_meters = threshold_meters;
        self.phase = MonitorPhase::Resolving;
        self.generation
    }

    /// Apply a resolution for the session `generation`.
    ///
    /// Returns false without touching anything when the session has since
    /// been superseded or stopped.
    pub fn apply_resolution(&mut self, generation: u64, resolution: Resolution) -> bool {
        if generation != self.generation || self.phase != MonitorPhase::Resolving {
            return false;
        }

        match resolution {
            Resolution::Found(place) => {
                self.target_coordinate = Some(place.coordinate);
                self.phase = MonitorPhase::Tracking;
            }
            Resolution::NotFound => {
                self.target_coordinate = None;
                self.phase = MonitorPhase::Idle;
            }
        }
        true
    }

    /// Change the radius of the open session.
    ///
    /// A worker already inside the new radius counts as arriving, so the
    /// return value mirrors [`ProximityState::ingest`].
    pub fn set_threshold(&mut self, threshold_meters: f64) -> Option<SampleOutcome> {
        self.threshold_meters = threshold_meters;
        let distance = self.distance_meters?;
        if !self.phase.accepts_samples() {
            return None;
        }
        Some(self.evaluate(distance))
    }

    /// Apply one worker sample
    pub fn ingest(&mut self, sample: WorkerSample) -> SampleOutcome {
        if !self.phase.accepts_samples() {
            return SampleOutcome::Rejected(SampleRejection::NotTracking);
        }
        let Some(target) = self.target_coordinate else {
            return SampleOutcome::Rejected(SampleRejection::NotTracking);
        };
        if !sample.coordinate.is_valid() {
            return SampleOutcome::Rejected(SampleRejection::InvalidCoordinate);
        }
        if let (Some(recorded), Some(last)) = (sample.recorded_at, self.last_sample_at) {
            if recorded < last {
                return SampleOutcome::Rejected(SampleRejection::Stale);
            }
        }

        if sample.recorded_at.is_some() {
            self.last_sample_at = sample.recorded_at;
        }
        self.last_worker_coordinate = Some(sample.coordinate);

        let distance = haversine_distance_meters(&target, &sample.coordinate);
        self.distance_meters = Some(distance);
        self.evaluate(distance)
    }

    /// End the session and invalidate any in-flight resolution
    pub fn stop(&mut self) {
        self.clear_session();
        self.generation += 1;
        self.phase = MonitorPhase::Stopped;
    }

    /// Observable outputs
    pub fn snapshot(&self) -> ProximitySnapshot {
        ProximitySnapshot {
            is_within_threshold: self.is_within_threshold,
            distance_meters: self.distance_meters,
            distance_formatted: self.distance_meters.map(format_distance),
            has_alerted: self.has_alerted,
            is_loading: self.phase == MonitorPhase::Resolving,
            target_coordinate: self.target_coordinate,
            phase: self.phase,
        }
    }

    fn evaluate(&mut self, distance_meters: f64) -> SampleOutcome {
        let was_within = self.is_within_threshold;
        self.is_within_threshold = distance_meters <= self.threshold_meters;

        if self.is_within_threshold && !was_within && !self.has_alerted {
            self.has_alerted = true;
            self.phase = MonitorPhase::Alerted;
            SampleOutcome::Arrived { distance_meters }
        } else {
            SampleOutcome::Updated { distance_meters }
        }
    }

    fn clear_session(&mut self) {
        self.target_address = None;
        self.target_coordinate = None;
        self.last_worker_coordinate = None;
        self.last_sample_at = None;
        self.distance_meters = None;
        self.is_within_threshold = false;
        self.has_alerted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_geocode::GeocodeResult;
    use chrono::TimeZone;

    const TARGET: Coordinate = Coordinate::new(43.6532, -79.3832);

    fn found() -> Resolution {
        Resolution::Found(GeocodeResult {
            coordinate: TARGET,
            display_name: "Toronto City Hall".to_string(),
        })
    }

    fn tracking(threshold: f64) -> ProximityState {
        let mut state = ProximityState::new(500.0);
        let generation = state.begin_session("100 queen st w".to_string(), threshold);
        assert!(state.apply_resolution(generation, found()));
        state
    }

    /// A point due north of the target at roughly `meters`
    fn north_of_target(meters: f64) -> WorkerSample {
        let degrees = meters / 111_195.0;
        WorkerSample::new(Coordinate::new(TARGET.latitude + degrees, TARGET.longitude))
    }

    fn at_minute(coordinate: Coordinate, minute: u32) -> WorkerSample {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 14, minute, 0).unwrap();
        WorkerSample::at(coordinate, ts)
    }

    #[test]
    fn test_initial_snapshot() {
        let snapshot = ProximityState::new(500.0).snapshot();

        assert_eq!(snapshot.phase, MonitorPhase::Idle);
        assert!(!snapshot.is_loading);
        assert!(!snapshot.has_alerted);
        assert!(snapshot.distance_meters.is_none());
        assert!(snapshot.distance_formatted.is_none());
    }

    #[test]
    fn test_resolving_is_loading() {
        let mut state = ProximityState::new(500.0);
        state.begin_session("somewhere".to_string(), 500.0);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.phase, MonitorPhase::Resolving);
        assert!(snapshot.is_loading);
    }

    #[test]
    fn test_not_found_goes_idle() {
        let mut state = ProximityState::new(500.0);
        let generation = state.begin_session("rr 2 nowhere".to_string(), 500.0);

        assert!(state.apply_resolution(generation, Resolution::NotFound));
        assert_eq!(state.phase(), MonitorPhase::Idle);
        assert!(state.snapshot().target_coordinate.is_none());

        let outcome = state.ingest(north_of_target(10.0));
        assert_eq!(outcome, SampleOutcome::Rejected(SampleRejection::NotTracking));
        assert!(!state.snapshot().has_alerted);
    }

    #[test]
    fn test_superseded_resolution_dropped() {
        let mut state = ProximityState::new(500.0);
        let old = state.begin_session("first address".to_string(), 500.0);
        let new = state.begin_session("second address".to_string(), 500.0);

        assert!(!state.apply_resolution(old, found()));
        assert_eq!(state.phase(), MonitorPhase::Resolving);
        assert!(state.apply_resolution(new, found()));
        assert_eq!(state.phase(), MonitorPhase::Tracking);
    }

    #[test]
    fn test_resolution_after_stop_dropped() {
        let mut state = ProximityState::new(500.0);
        let generation = state.begin_session("first address".to_string(), 500.0);
        state.stop();

        assert!(!state.apply_resolution(generation, found()));
        assert_eq!(state.phase(), MonitorPhase::Stopped);
        assert!(state.snapshot().target_coordinate.is_none());
    }

    #[test]
    fn test_alert_on_crossing() {
        let mut state = tracking(500.0);

        assert!(matches!(state.ingest(north_of_target(900.0)), SampleOutcome::Updated { .. }));
        assert!(!state.snapshot().has_alerted);

        assert!(matches!(state.ingest(north_of_target(100.0)), SampleOutcome::Arrived { .. }));
        let snapshot = state.snapshot();
        assert!(snapshot.has_alerted);
        assert!(snapshot.is_within_threshold);
        assert_eq!(snapshot.phase, MonitorPhase::Alerted);
    }

    #[test]
    fn test_alert_is_one_shot() {
        let mut state = tracking(500.0);
        let outcomes: Vec<_> = [600.0, 400.0, 600.0, 300.0]
            .into_iter()
            .map(|m| state.ingest(north_of_target(m)))
            .collect();

        let arrivals = outcomes
            .iter()
            .filter(|o| matches!(o, SampleOutcome::Arrived { .. }))
            .count();
        assert_eq!(arrivals, 1);
        assert!(matches!(outcomes[1], SampleOutcome::Arrived { .. }));

        let snapshot = state.snapshot();
        assert!(snapshot.has_alerted);
        assert!(snapshot.is_within_threshold);
        assert_eq!(snapshot.phase, MonitorPhase::Alerted);
    }

    #[test]
    fn test_leaving_keeps_alert() {
        let mut state = tracking(500.0);
        state.ingest(north_of_target(100.0));
        state.ingest(north_of_target(2_000.0));

        let snapshot = state.snapshot();
        assert!(snapshot.has_alerted);
        assert!(!snapshot.is_within_threshold);
        assert_eq!(snapshot.distance_formatted.as_deref(), Some("2.0km"));
    }

    #[test]
    fn test_first_sample_inside_alerts() {
        let mut state = tracking(500.0);
        assert!(matches!(state.ingest(north_of_target(50.0)), SampleOutcome::Arrived { .. }));
    }

    #[test]
    fn test_boundary_is_inside() {
        let mut state = tracking(500.0);
        let sample = north_of_target(499.0);
        let exact = haversine_distance_meters(&TARGET, &sample.coordinate);

        let mut state_at_exact = tracking(exact);
        assert!(matches!(state_at_exact.ingest(sample), SampleOutcome::Arrived { .. }));
        assert!(matches!(state.ingest(sample), SampleOutcome::Arrived { .. }));
    }

    #[test]
    fn test_invalid_coordinate_dropped() {
        let mut state = tracking(500.0);
        state.ingest(north_of_target(900.0));

        let outcome = state.ingest(WorkerSample::new(Coordinate::new(f64::NAN, 0.0)));
        assert_eq!(outcome, SampleOutcome::Rejected(SampleRejection::InvalidCoordinate));

        let outcome = state.ingest(WorkerSample::new(Coordinate::new(91.0, 0.0)));
        assert_eq!(outcome, SampleOutcome::Rejected(SampleRejection::InvalidCoordinate));

        let distance = state.snapshot().distance_meters.unwrap();
        assert!((distance - 900.0).abs() < 1.0);
    }

    #[test]
    fn test_stale_sample_dropped() {
        let mut state = tracking(500.0);
        let far = north_of_target(900.0).coordinate;
        let near = north_of_target(100.0).coordinate;

        state.ingest(at_minute(far, 10));
        let outcome = state.ingest(at_minute(near, 5));

        assert_eq!(outcome, SampleOutcome::Rejected(SampleRejection::Stale));
        assert!(!state.snapshot().has_alerted);
        assert_eq!(state.last_worker_coordinate(), Some(far));
    }

    #[test]
    fn test_untimestamped_samples_apply_in_order() {
        let mut state = tracking(500.0);
        let far = north_of_target(900.0).coordinate;

        state.ingest(at_minute(far, 10));
        let outcome = state.ingest(north_of_target(100.0));

        assert!(matches!(outcome, SampleOutcome::Arrived { .. }));
    }

    #[test]
    fn test_stop_clears_session() {
        let mut state = tracking(500.0);
        state.ingest(north_of_target(100.0));
        let before = state.generation();

        state.stop();
        let snapshot = state.snapshot();

        assert_eq!(snapshot.phase, MonitorPhase::Stopped);
        assert!(!snapshot.has_alerted);
        assert!(!snapshot.is_within_threshold);
        assert!(snapshot.distance_meters.is_none());
        assert!(snapshot.target_coordinate.is_none());
        assert!(state.last_worker_coordinate().is_none());
        assert!(state.generation() > before);

        let outcome = state.ingest(north_of_target(100.0));
        assert_eq!(outcome, SampleOutcome::Rejected(SampleRejection::NotTracking));
    }

    #[test]
    fn test_new_session_resets_alert() {
        let mut state = tracking(500.0);
        state.ingest(north_of_target(100.0));

        let generation = state.begin_session("another client".to_string(), 500.0);
        assert!(!state.snapshot().has_alerted);
        assert!(state.apply_resolution(generation, found()));
        assert!(matches!(state.ingest(north_of_target(100.0)), SampleOutcome::Arrived { .. }));
    }

    #[test]
    fn test_widening_threshold_counts_as_arrival() {
        let mut state = tracking(500.0);
        state.ingest(north_of_target(800.0));

        let outcome = state.set_threshold(1_000.0);
        assert!(matches!(outcome, Some(SampleOutcome::Arrived { .. })));
        assert!(state.snapshot().has_alerted);
    }

    #[test]
    fn test_threshold_change_without_distance() {
        let mut state = tracking(500.0);
        assert_eq!(state.set_threshold(250.0), None);
        assert_eq!(state.threshold_meters(), 250.0);
    }

    #[test]
    fn test_is_watching() {
        let state = tracking(500.0);
        assert!(state.is_watching("100 queen st w"));
        assert!(!state.is_watching("200 king st"));
    }

    #[test]
    fn test_snapshot_json_keys() {
        let mut state = tracking(500.0);
        state.ingest(north_of_target(100.0));

        let json = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(json["hasAlerted"], true);
        assert_eq!(json["isWithinThreshold"], true);
        assert_eq!(json["isLoading"], false);
        assert_eq!(json["distanceFormatted"], "100m");
        assert_eq!(json["phase"], "alerted");
        assert!(json["targetCoordinate"]["latitude"].is_number());
    }
}
