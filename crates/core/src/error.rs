//! Error handling with codes, context and recovery suggestions
//!
//! Every crate in the workspace can surface a [`Error`] carrying:
//! - A numeric code for programmatic handling
//! - Optional context describing what was being attempted
//! - An optional recovery suggestion
//! - A serializable report for logs and CLI output

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum ErrorCode {
    // IO errors (2xxx)
    IoError = 2000,
    FileNotFound = 2001,
    PermissionDenied = 2002,

    // Configuration errors (3xxx)
    ConfigNotFound = 3001,
    ConfigParseError = 3002,
    ConfigValidationError = 3003,

    // Geospatial errors (4xxx)
    InvalidCoordinate = 4001,
    InvalidPostalCode = 4002,

    // Geocoding errors (5xxx)
    GeocodeError = 5000,
    GeocodeUnavailable = 5001,
    GeocodeRateLimited = 5002,
}

impl ErrorCode {
    /// Get the numeric code
    #[must_use]
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a human-readable category
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            2 => "IO",
            3 => "Configuration",
            4 => "Geo",
            _ => "Geocoding",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Main error type with rich context
#[derive(Error, Debug)]
pub struct Error {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional context
    pub context: Option<String>,
    /// Recovery suggestion
    pub suggestion: Option<String>,
    /// Source error
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, "\n  Context: {ctx}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {suggestion}")?;
        }
        Ok(())
    }
}

impl Error {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Add context to the error
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a recovery suggestion
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add a source error
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Convert to a serializable report
    #[must_use]
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code,
            code_str: self.code.to_string(),
            category: self.code.category().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
            suggestion: self.suggestion.clone(),
            source: self.source.as_ref().map(ToString::to_string),
        }
    }

    // Convenience constructors

    /// Configuration file missing at an explicit path
    pub fn config_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create a careline.toml file or use --config to specify a path")
    }

    /// Configuration value out of range
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigValidationError, message)
    }

    /// Coordinate outside the valid latitude/longitude range
    pub fn invalid_coordinate(latitude: f64, longitude: f64) -> Self {
        Self::new(
            ErrorCode::InvalidCoordinate,
            format!("Invalid coordinate: ({latitude}, {longitude})"),
        )
        .with_suggestion("Latitude must be within [-90, 90] and longitude within [-180, 180]")
    }

    /// Input that is not a Canadian postal code
    pub fn invalid_postal_code(input: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidPostalCode,
            format!("Invalid postal code: {}", input.into()),
        )
        .with_suggestion("Use the A1A 1A1 form, e.g. M5V 3L9")
    }
}

/// Serializable error report for logging and CLI output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub code_str: String,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for CLI commands
#[allow(missing_docs)]
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const VALIDATION_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("JSON parse error: {err}"))
            .with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("TOML parse error: {err}"))
            .with_source(err)
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Attach context to the error, if any
    fn context(self, context: impl Into<String>) -> Result<T>;
    /// Attach a recovery suggestion to the error, if any
    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_suggestion(suggestion))
    }
}
