//! Configuration loading and schema definitions
//!
//! A single `careline.toml` drives the geocoder, the proximity monitor and
//! logging. Every field has a serde default so a partial file is valid.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
