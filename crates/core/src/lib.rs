//! Core utilities shared by the Careline proximity crates
//!
//! This crate provides the plumbing every other crate leans on:
//!
//! - **Error handling**: errors with codes, context, and recovery suggestions
//! - **Retry**: exponential backoff settings and a circuit breaker
//! - **Rate limiting**: token buckets keyed by endpoint
//! - **Configuration**: TOML-based configuration with serde defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use careline_core::config::Config;
//!
//! let config = Config::load(None).expect("config");
//! println!("threshold: {}m", config.schema.proximity.threshold_meters);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod retry;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::rate_limit::{RateLimitConfig, RateLimiter};
    pub use crate::retry::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig};
}
