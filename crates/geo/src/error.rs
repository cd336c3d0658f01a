//! Error types for the geo crate.

use thiserror::Error;

/// Result type alias for geo operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors that can occur during geo operations.
#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    /// Latitude or longitude outside the valid range, or not a number
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Input is not a Canadian postal code
    #[error("Invalid postal code: {0}")]
    InvalidPostalCode(String),
}

/// Error code for integration with careline-core error handling.
/// Range: 40xx for geo errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorCode {
    /// Invalid coordinate values
    InvalidCoordinate = 4001,
    /// Invalid postal code
    InvalidPostalCode = 4002,
}

impl GeoError {
    /// Returns the error code for this error.
    pub fn code(&self) -> GeoErrorCode {
        match self {
            GeoError::InvalidCoordinate(_) => GeoErrorCode::InvalidCoordinate,
            GeoError::InvalidPostalCode(_) => GeoErrorCode::InvalidPostalCode,
        }
    }
}
