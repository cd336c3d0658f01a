//! Configuration for the geocoding client
//!
//! Supports environment-based configuration with sensible defaults, or
//! construction from the `[geocoder]` section of `careline.toml`.

use crate::error::{GeocodeError, Result};
use careline_core::config::GeocoderSection;
use careline_core::rate_limit::RateLimitConfig;
use careline_core::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Public OpenStreetMap Nominatim instance
const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Local Nominatim container used during development
const DEVELOPMENT_BASE_URL: &str = "http://localhost:8080";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development against a self-hosted geocoder
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    #[default]
    Production,
}

impl Environment {
    /// Parse from the `CARELINE_ENV` environment variable
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(&env::var("CARELINE_ENV").unwrap_or_default())
    }

    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "development" | "dev" | "local" => Self::Development,
            "staging" | "stage" => Self::Staging,
            _ => Self::Production,
        }
    }

    fn retry(self) -> RetryConfig {
        match self {
            Self::Development => RetryConfig::quick(),
            Self::Staging => RetryConfig::default(),
            Self::Production => RetryConfig::patient(),
        }
    }
}

/// Geocoder client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Base URL of the Nominatim-compatible API
    pub base_url: String,
    /// Identifying User-Agent, required by the provider's usage policy
    pub user_agent: String,
    /// ISO 3166-1 alpha-2 code restricting results (`countrycodes=`)
    pub country_code: String,
    /// Country name appended to queries that do not mention it
    pub country_name: String,
    /// Request timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
    /// Rate limit configuration
    pub rate_limit: RateLimitConfig,
    /// Current environment
    pub environment: Environment,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self::from_section(&GeocoderSection::default())
    }
}

impl GeocoderConfig {
    /// Create configuration from environment variables
    ///
    /// Reads the following environment variables:
    /// - `CARELINE_GEOCODER_URL`: Base URL of the geocoder
    /// - `CARELINE_GEOCODER_USER_AGENT`: Identifying User-Agent
    /// - `CARELINE_COUNTRY_CODE` / `CARELINE_COUNTRY_NAME`: Region scoping
    /// - `CARELINE_GEOCODER_TIMEOUT_SECS`: Request timeout in seconds
    /// - `CARELINE_ENV`: Environment (development/staging/production)
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_env();
        let defaults = GeocoderSection::default();

        let base_url = env::var("CARELINE_GEOCODER_URL").unwrap_or_else(|_| match environment {
            Environment::Development => DEVELOPMENT_BASE_URL.to_string(),
            Environment::Staging | Environment::Production => DEFAULT_BASE_URL.to_string(),
        });

        let timeout = match env::var("CARELINE_GEOCODER_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| GeocodeError::config(format!("invalid timeout seconds: {raw}")))?,
            Err(_) => DEFAULT_TIMEOUT,
        };

        let config = Self {
            base_url,
            user_agent: env::var("CARELINE_GEOCODER_USER_AGENT").unwrap_or(defaults.user_agent),
            country_code: env::var("CARELINE_COUNTRY_CODE").unwrap_or(defaults.country_code),
            country_name: env::var("CARELINE_COUNTRY_NAME").unwrap_or(defaults.country_name),
            timeout,
            retry: environment.retry(),
            rate_limit: RateLimitConfig::strict(defaults.requests_per_second, Duration::from_secs(1)),
            environment,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create configuration from the `[geocoder]` section of `careline.toml`
    #[must_use]
    pub fn from_section(section: &GeocoderSection) -> Self {
        let environment = Environment::from_env();
        Self {
            base_url: section.base_url.clone(),
            user_agent: section.user_agent.clone(),
            country_code: section.country_code.clone(),
            country_name: section.country_name.clone(),
            timeout: Duration::from_secs(section.timeout_secs),
            retry: environment.retry(),
            rate_limit: RateLimitConfig::strict(section.requests_per_second, Duration::from_secs(1)),
            environment,
        }
    }

    /// Builder-style method to set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set the User-Agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Builder-style method to set the country scope
    #[must_use]
    pub fn with_country(mut self, code: impl Into<String>, name: impl Into<String>) -> Self {
        self.country_code = code.into();
        self.country_name = name.into();
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set retry config
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Builder-style method to set rate limit config
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// The search endpoint URL
    #[must_use]
    pub fn search_url(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(GeocodeError::config("base_url cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(GeocodeError::InvalidUrl(self.base_url.clone()));
        }

        if self.user_agent.trim().is_empty() {
            return Err(GeocodeError::config(
                "user_agent cannot be empty; the provider rejects anonymous clients",
            ));
        }

        if self.country_code.len() != 2 || !self.country_code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(GeocodeError::config(format!(
                "country_code must be a two-letter ISO code, got {:?}",
                self.country_code
            )));
        }

        if self.timeout.is_zero() {
            return Err(GeocodeError::config("timeout cannot be zero"));
        }

        if self.retry.max_attempts == 0 {
            return Err(GeocodeError::config("retry.max_attempts must be at least 1"));
        }

        if self.rate_limit.max_requests == 0 {
            return Err(GeocodeError::config("rate_limit.max_requests cannot be zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeocoderConfig::default();
        assert!(config.base_url.contains("nominatim"));
        assert_eq!(config.country_code, "ca");
        assert_eq!(config.country_name, "Canada");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.rate_limit.max_requests, 1);
        assert_eq!(config.rate_limit.burst, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("dev"), Environment::Development);
        assert_eq!(Environment::parse("STAGING"), Environment::Staging);
        assert_eq!(Environment::parse(""), Environment::Production);
    }

    #[test]
    fn test_builder_pattern() {
        let config = GeocoderConfig::default()
            .with_base_url("http://localhost:8080/")
            .with_country("us", "United States")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.search_url(), "http://localhost:8080/search");
        assert_eq!(config.country_code, "us");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_validation() {
        assert!(GeocoderConfig::default().validate().is_ok());

        let no_scheme = GeocoderConfig::default().with_base_url("nominatim.local");
        assert!(matches!(no_scheme.validate(), Err(GeocodeError::InvalidUrl(_))));

        let anonymous = GeocoderConfig::default().with_user_agent("  ");
        assert!(anonymous.validate().is_err());

        let bad_country = GeocoderConfig::default().with_country("canada", "Canada");
        assert!(bad_country.validate().is_err());

        let zero_timeout = GeocoderConfig::default().with_timeout(Duration::ZERO);
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_from_section() {
        let section = GeocoderSection {
            timeout_secs: 7,
            requests_per_second: 2,
            ..GeocoderSection::default()
        };
        let config = GeocoderConfig::from_section(&section);
        assert_eq!(config.timeout, Duration::from_secs(7));
        assert_eq!(config.rate_limit.max_requests, 2);
    }
}
