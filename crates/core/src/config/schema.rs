//! Configuration schema definitions

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    /// Geocoding provider settings
    #[serde(default)]
    pub geocoder: GeocoderSection,

    /// Proximity monitor settings
    #[serde(default)]
    pub proximity: ProximitySection,

    /// Logging settings
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl ConfigSchema {
    /// Check values serde cannot constrain
    pub fn validate(&self) -> Result<()> {
        let threshold = self.proximity.threshold_meters;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(Error::config_invalid(format!(
                "proximity.threshold_meters must be a positive number, got {threshold}"
            )));
        }
        if self.geocoder.timeout_secs == 0 {
            return Err(Error::config_invalid("geocoder.timeout_secs cannot be zero"));
        }
        if self.geocoder.requests_per_second == 0 {
            return Err(Error::config_invalid(
                "geocoder.requests_per_second cannot be zero",
            ));
        }
        Ok(())
    }
}

/// Geocoding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderSection {
    /// Base URL of the Nominatim-compatible search API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Identifying User-Agent required by the provider's usage policy
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// ISO country code restricting results
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Country name appended to queries that do not mention it
    #[serde(default = "default_country_name")]
    pub country_name: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sustained request rate allowed by the provider
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for GeocoderSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            country_code: default_country_code(),
            country_name: default_country_name(),
            timeout_secs: default_timeout_secs(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

fn default_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    concat!("careline-proximity/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_country_code() -> String {
    "ca".to_string()
}

fn default_country_name() -> String {
    "Canada".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_requests_per_second() -> u32 {
    1
}

/// Proximity monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximitySection {
    /// Radius around the client's address that counts as "nearby"
    #[serde(default = "default_threshold_meters")]
    pub threshold_meters: f64,

    /// How long the arrival banner stays highlighted
    #[serde(default = "default_highlight_secs")]
    pub highlight_secs: u64,
}

impl Default for ProximitySection {
    fn default() -> Self {
        Self {
            threshold_meters: default_threshold_meters(),
            highlight_secs: default_highlight_secs(),
        }
    }
}

fn default_threshold_meters() -> f64 {
    500.0
}

fn default_highlight_secs() -> u64 {
    5
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySection {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
