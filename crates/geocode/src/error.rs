//! Error types for the geocoding client

use careline_core::error::{Error as CoreError, ErrorCode};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for geocoding operations
pub type Result<T> = std::result::Result<T, GeocodeError>;

/// Geocoding client errors
///
/// None of these reach monitor callers: the resolver folds every one of them
/// into "not found".
#[derive(Error, Debug)]
pub enum GeocodeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body was not the expected JSON
    #[error("Malformed geocoder response: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Provider returned a non-success status
    #[error("Geocoder error ({status}): {message}")]
    ApiResponse {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Request timeout
    #[error("Geocoder request timed out after {0:?}")]
    Timeout(Duration),

    /// Circuit breaker is open
    #[error("Circuit breaker is open - geocoder temporarily unavailable")]
    CircuitOpen,

    /// Provider returned a coordinate outside the valid range
    #[error("Geocoder returned an invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// All retry attempts exhausted
    #[error("All {attempts} geocoder attempts failed: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last error message
        last_error: String,
    },
}

impl GeocodeError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an API response error
    pub fn api_response(status: u16, message: impl Into<String>) -> Self {
        Self::ApiResponse {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is worth another attempt
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            // 5xx and 429 (throttled by the provider)
            Self::ApiResponse { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout(_) => true,
            Self::CircuitOpen
            | Self::Config(_)
            | Self::InvalidUrl(_)
            | Self::Json(_)
            | Self::InvalidCoordinate(_)
            | Self::RetriesExhausted { .. } => false,
        }
    }

    /// Short label for logs and metrics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Json(_) => "malformed",
            Self::Config(_) => "config",
            Self::InvalidUrl(_) => "invalid_url",
            Self::ApiResponse { .. } => "status",
            Self::Timeout(_) => "timeout",
            Self::CircuitOpen => "circuit_open",
            Self::InvalidCoordinate(_) => "invalid_coordinate",
            Self::RetriesExhausted { .. } => "retries_exhausted",
        }
    }
}

impl From<GeocodeError> for CoreError {
    fn from(err: GeocodeError) -> Self {
        let (code, suggestion) = match &err {
            GeocodeError::Config(_) | GeocodeError::InvalidUrl(_) => (
                ErrorCode::ConfigValidationError,
                Some("Check the [geocoder] section of careline.toml"),
            ),
            GeocodeError::ApiResponse { status: 429, .. } => (
                ErrorCode::GeocodeRateLimited,
                Some("Lower geocoder.requests_per_second or use a self-hosted geocoder"),
            ),
            GeocodeError::Timeout(_)
            | GeocodeError::CircuitOpen
            | GeocodeError::RetriesExhausted { .. } => (
                ErrorCode::GeocodeUnavailable,
                Some("The geocoder is not responding; try again later"),
            ),
            _ => (ErrorCode::GeocodeError, None),
        };

        let converted = CoreError::new(code, err.to_string());
        let converted = match suggestion {
            Some(hint) => converted.with_suggestion(hint),
            None => converted,
        };
        converted.with_source(err)
    }
}
