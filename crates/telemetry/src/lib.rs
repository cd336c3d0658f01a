//! Logging and in-process metrics for the Careline proximity crates
//!
//! - Structured logging with `tracing`, compact or JSON
//! - A global counter/histogram registry exported as JSON
//! - Timers that record operation latency

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uuid::Uuid;

/// Metric names shared across crates
pub mod names {
    /// Resolver answered from its cache
    pub const GEOCODE_CACHE_HIT: &str = "geocode.cache_hit";
    /// Resolver had to ask the provider
    pub const GEOCODE_CACHE_MISS: &str = "geocode.cache_miss";
    /// Resolution folded into "not found"
    pub const GEOCODE_NOT_FOUND: &str = "geocode.not_found";
    /// Provider lookup latency in milliseconds
    pub const GEOCODE_LOOKUP_MS: &str = "geocode.lookup_ms";
    /// Arrival alerts raised
    pub const PROXIMITY_ALERTS: &str = "proximity.alerts";
    /// Worker samples dropped as out of order
    pub const PROXIMITY_STALE_SAMPLES: &str = "proximity.stale_samples";
    /// Resolutions discarded because their session was superseded
    pub const PROXIMITY_STALE_RESOLUTIONS: &str = "proximity.stale_resolutions";
}

/// Global metrics registry
static METRICS: Lazy<MetricsRegistry> = Lazy::new(MetricsRegistry::new);

/// Global session ID for correlating logs
static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Initialize logging with custom configuration
///
/// `RUST_LOG` takes precedence over `config.log_level`.
pub fn init_with_config(config: &TelemetryConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.show_target)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(config.show_target)
                    .with_thread_ids(config.show_thread_ids)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {e}"))?;

    tracing::debug!(
        session_id = %session_id(),
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry initialized"
    );

    Ok(())
}

/// Get the current session ID
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default filter directive
    pub log_level: String,
    /// Emit JSON lines
    pub json: bool,
    /// Include the event target
    pub show_target: bool,
    /// Include thread ids
    pub show_thread_ids: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            show_target: false,
            show_thread_ids: false,
        }
    }
}

impl TelemetryConfig {
    /// Raise the filter to `debug` for `--verbose` runs
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.log_level = "debug".to_string();
        }
        self
    }
}

/// Metrics registry for collecting and exporting metrics
pub struct MetricsRegistry {
    counters: RwLock<HashMap<String, AtomicU64>>,
    histograms: RwLock<HashMap<String, Vec<f64>>>,
    start_time: Instant,
}

impl MetricsRegistry {
    fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Increment a counter
    pub fn increment(&self, name: &str) {
        self.increment_by(name, 1);
    }

    /// Increment a counter by a specific amount
    pub fn increment_by(&self, name: &str, value: u64) {
        {
            let counters = self.counters.read().unwrap_or_else(|e| e.into_inner());
            if let Some(counter) = counters.get(name) {
                counter.fetch_add(value, Ordering::Relaxed);
                return;
            }
        }
        let mut counters = self.counters.write().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(value, Ordering::Relaxed);
    }

    /// Current value of a counter (0 when never incremented)
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Record a histogram value
    pub fn histogram(&self, name: &str, value: f64) {
        let mut histograms = self.histograms.write().unwrap_or_else(|e| e.into_inner());
        histograms.entry(name.to_string()).or_default().push(value);
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics as JSON
    pub fn export_json(&self) -> serde_json::Value {
        let counters = self.counters.read().unwrap_or_else(|e| e.into_inner());
        let histograms = self.histograms.read().unwrap_or_else(|e| e.into_inner());

        let counter_values: HashMap<&str, u64> = counters
            .iter()
            .map(|(k, v)| (k.as_str(), v.load(Ordering::Relaxed)))
            .collect();

        let histogram_stats: HashMap<&str, HistogramStats> = histograms
            .iter()
            .map(|(k, v)| (k.as_str(), HistogramStats::from_values(v)))
            .collect();

        serde_json::json!({
            "session_id": session_id(),
            "uptime_secs": self.uptime_secs(),
            "counters": counter_values,
            "histograms": histogram_stats,
        })
    }
}

/// Histogram statistics
#[derive(Debug, Serialize)]
pub struct HistogramStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
}

impl HistogramStats {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                count: 0,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                p50: 0.0,
                p95: 0.0,
            };
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();

        Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean: sum / count as f64,
            p50: percentile(&sorted, 50.0),
            p95: percentile(&sorted, 95.0),
        }
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Get the global metrics registry
pub fn metrics() -> &'static MetricsRegistry {
    &METRICS
}

/// Timer for measuring operation duration, recorded into a histogram on stop
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    /// Start a new timer
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) -> Duration {
        let duration = self.start.elapsed();
        metrics().histogram(self.name, duration.as_secs_f64() * 1000.0);
        tracing::trace!(
            metric = %self.name,
            duration_ms = duration.as_millis(),
            "Timer completed"
        );
        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counter() {
        let registry = MetricsRegistry::new();
        registry.increment("test_counter");
        registry.increment("test_counter");
        registry.increment_by("test_counter", 3);

        assert_eq!(registry.counter("test_counter"), 5);
        assert_eq!(registry.counter("never_touched"), 0);
    }

    #[test]
    fn test_histogram_stats() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let stats = HistogramStats::from_values(&values);

        assert_eq!(stats.count, 10);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 10.0);
        assert_eq!(stats.mean, 5.5);
    }

    #[test]
    fn test_export_json_shape() {
        let registry = MetricsRegistry::new();
        registry.increment(names::GEOCODE_CACHE_HIT);
        registry.histogram(names::GEOCODE_LOOKUP_MS, 12.5);

        let json = registry.export_json();
        assert_eq!(json["counters"][names::GEOCODE_CACHE_HIT], 1);
        assert_eq!(json["histograms"][names::GEOCODE_LOOKUP_MS]["count"], 1);
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start("test_operation");
        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.stop();
        assert!(duration.as_millis() >= 10);
    }

    #[test]
    fn test_verbose_raises_level() {
        let config = TelemetryConfig::default().verbose(true);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_session_id() {
        let id = session_id();
        assert!(Uuid::parse_str(id).is_ok());
    }
}
