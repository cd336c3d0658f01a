//! Address and postal code resolution for proximity alerts
//!
//! This crate turns a client's address into a coordinate once, and then
//! keeps answering from memory.
//!
//! # Features
//!
//! - **Failure-absorbing resolver**: every outcome is `Found` or `NotFound`
//! - **Process-wide cache**: one provider call per distinct address
//! - **Nominatim client**: retry with backoff, circuit breaker, throttling
//!   to the provider's usage policy, request correlation IDs
//! - **Provider seam**: swap in any [`GeocodeProvider`] (tests use fakes)
//!
//! # Example
//!
//! ```rust,no_run
//! use careline_geocode::{CoordinateResolver, GeocoderConfig, Resolution};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = CoordinateResolver::from_config(GeocoderConfig::from_env()?)?;
//!
//!     match resolver.resolve("100 Queen St W, Toronto").await {
//!         Resolution::Found(place) => println!("{} -> {}", place.display_name, place.coordinate),
//!         Resolution::NotFound => println!("no coordinate available"),
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod resolver;

pub use cache::{CacheStats, GeocodeCache};
pub use client::NominatimClient;
pub use config::{Environment, GeocoderConfig};
pub use error::{GeocodeError, Result};
pub use provider::{BoxFuture, GeocodeProvider, GeocodeResult};
pub use resolver::{CoordinateResolver, Resolution, MIN_ADDRESS_CHARS};
