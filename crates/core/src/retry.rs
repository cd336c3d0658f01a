//! Backoff settings and circuit breaking for outbound lookups
//!
//! The geocoding client retries transient failures with exponential
//! backoff and stops calling a provider that keeps failing:
//! - [`RetryConfig`] decides how many attempts and how long to wait
//! - [`CircuitBreaker`] rejects calls while a provider is unhealthy
//!
//! # Example
//!
//! ```rust
//! use careline_core::retry::{CircuitBreaker, CircuitBreakerConfig, RetryConfig};
//! use std::time::Duration;
//!
//! let retry = RetryConfig { jitter: false, ..RetryConfig::default() };
//! assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(400));
//!
//! let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
//! assert!(breaker.can_execute());
//! ```

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add random jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Short delays, for local development against a mock provider
    #[must_use]
    pub fn quick() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Longer waits that still respect a one-request-per-second provider
    #[must_use]
    pub fn patient() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// A single attempt, no retries
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    /// Calculate delay before a given attempt (attempt 0 never waits)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.jitter {
            // Up to 25% extra
            delay_secs * (1.0 + jitter_fraction() * 0.25)
        } else {
            delay_secs
        };

        Duration::from_secs_f64(final_delay)
    }
}

/// Cheap pseudo-random fraction in [0.0, 1.0)
fn jitter_fraction() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    hasher.write_u32(nanos);
    #[allow(clippy::cast_precision_loss)]
    let fraction = (hasher.finish() % 1000) as f64 / 1000.0;
    fraction
}

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls flow normally
    Closed,
    /// Calls are rejected until the reset timeout elapses
    Open,
    /// A trial call is allowed through
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Number of successes in half-open needed to close the circuit
    pub success_threshold: u32,
    /// Time to wait before allowing a trial call
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 1,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

/// Circuit breaker for a single upstream provider
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: RwLock<CircuitState>,
    opened_at: RwLock<Option<Instant>>,
    failure_count: AtomicU32,
    success_count: AtomicU32,
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(CircuitState::Closed),
            opened_at: RwLock::new(None),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
        }
    }

    /// Get current state
    #[must_use]
    pub fn state(&self) -> CircuitState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: CircuitState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
    }

    /// Check if the circuit allows a call, moving Open to HalfOpen once the
    /// reset timeout has elapsed
    pub fn can_execute(&self) -> bool {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let opened_at = *self.opened_at.read().unwrap_or_else(|e| e.into_inner());
                let elapsed = opened_at.map_or(Duration::MAX, |t| t.elapsed());

                if elapsed >= self.config.reset_timeout {
                    self.set_state(CircuitState::HalfOpen);
                    self.success_count.store(0, Ordering::Relaxed);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call
    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);

        if self.state() == CircuitState::HalfOpen {
            let successes = self.success_count.fetch_add(1, Ordering::Relaxed) + 1;
            if successes >= self.config.success_threshold {
                self.set_state(CircuitState::Closed);
            }
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;

        let should_open = match self.state() {
            CircuitState::Closed => failures >= self.config.failure_threshold,
            // Any failure during the trial re-opens
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        if should_open {
            *self.opened_at.write().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
            self.set_state(CircuitState::Open);
        }
    }

    /// Reset the circuit breaker
    pub fn reset(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        self.success_count.store(0, Ordering::Relaxed);
        *self.opened_at.write().unwrap_or_else(|e| e.into_inner()) = None;
        self.set_state(CircuitState::Closed);
    }
}
