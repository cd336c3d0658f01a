//! Token bucket rate limiting for outbound API calls
//!
//! Public geocoders publish a usage policy (typically one request per
//! second). A [`RateLimiter`] keeps one bucket per key so callers can either
//! reject a call or wait until the next token is available.
//!
//! # Example
//!
//! ```rust
//! use careline_core::rate_limit::{RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitConfig::strict(1, std::time::Duration::from_secs(1)));
//!
//! assert!(limiter.try_acquire("search"));
//! assert!(!limiter.try_acquire("search"));
//! assert!(!limiter.time_until_available("search", 1).is_zero());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
    /// Burst allowance (extra requests allowed in short bursts)
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_second(1)
    }
}

impl RateLimitConfig {
    /// Create a strict rate limit (no burst)
    #[must_use]
    pub fn strict(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            burst: 0,
        }
    }

    /// Per-second rate limit
    #[must_use]
    pub fn per_second(max: u32) -> Self {
        Self {
            max_requests: max,
            window: Duration::from_secs(1),
            burst: max / 2,
        }
    }

    /// Per-minute rate limit
    #[must_use]
    pub fn per_minute(max: u32) -> Self {
        Self {
            max_requests: max,
            window: Duration::from_secs(60),
            burst: max / 4,
        }
    }

    fn capacity(&self) -> f64 {
        f64::from(self.max_requests + self.burst)
    }

    fn refill_rate(&self) -> f64 {
        f64::from(self.max_requests) / self.window.as_secs_f64()
    }
}

/// Token bucket state
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
    config: RateLimitConfig,
}

impl TokenBucket {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            tokens: config.capacity(),
            last_update: Instant::now(),
            config,
        }
    }

    fn try_acquire(&mut self, tokens: u32) -> bool {
        self.refill();

        if self.tokens >= f64::from(tokens) {
            self.tokens -= f64::from(tokens);
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update);
        let new_tokens = elapsed.as_secs_f64() * self.config.refill_rate();

        self.tokens = (self.tokens + new_tokens).min(self.config.capacity());
        self.last_update = now;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn available(&mut self) -> u32 {
        self.refill();
        self.tokens as u32
    }

    fn time_until_available(&mut self, tokens: u32) -> Duration {
        self.refill();

        if self.tokens >= f64::from(tokens) {
            return Duration::ZERO;
        }

        let needed = f64::from(tokens) - self.tokens;
        Duration::from_secs_f64(needed / self.config.refill_rate())
    }
}

/// Rate limiter with one bucket per key
pub struct RateLimiter {
    buckets: RwLock<HashMap<String, TokenBucket>>,
    default_config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            default_config: config,
        }
    }

    fn with_bucket<T>(&self, key: &str, f: impl FnOnce(&mut TokenBucket) -> T) -> T {
        // A poisoned lock still holds valid bucket data
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.default_config.clone()));
        f(bucket)
    }

    /// Try to acquire a token for the given key
    #[must_use]
    pub fn try_acquire(&self, key: &str) -> bool {
        self.with_bucket(key, |bucket| bucket.try_acquire(1))
    }

    /// Get available tokens for a key
    #[must_use]
    pub fn available(&self, key: &str) -> u32 {
        self.with_bucket(key, TokenBucket::available)
    }

    /// Get time until the given number of tokens is available
    #[must_use]
    pub fn time_until_available(&self, key: &str, tokens: u32) -> Duration {
        self.with_bucket(key, |bucket| bucket.time_until_available(tokens))
    }

    /// Reset rate limit for a key
    pub fn reset(&self, key: &str) {
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        buckets.remove(key);
    }

    /// Get rate limit status
    #[must_use]
    pub fn status(&self, key: &str) -> RateLimitStatus {
        let max = self.default_config.max_requests + self.default_config.burst;
        let max_requests = self.default_config.max_requests;
        self.with_bucket(key, |bucket| RateLimitStatus {
            available: bucket.available(),
            max,
            reset_in: bucket.time_until_available(max_requests),
        })
    }
}

/// Rate limit status
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    /// Available tokens
    pub available: u32,
    /// Maximum tokens
    pub max: u32,
    /// Time until the bucket holds a full window of tokens again
    pub reset_in: Duration,
}
