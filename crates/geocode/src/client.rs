//! HTTP client for Nominatim-compatible geocoders

use crate::config::GeocoderConfig;
use crate::error::{GeocodeError, Result};
use crate::provider::{BoxFuture, GeocodeProvider, GeocodeResult};
use careline_core::rate_limit::RateLimiter;
use careline_core::retry::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use careline_geo::Coordinate;
use careline_telemetry::{names, Timer};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

/// Rate limit bucket for the search endpoint
const SEARCH_BUCKET: &str = "search";

/// Only the best match is ever used
const RESULT_LIMIT: &str = "1";

/// One element of the provider's JSON array
#[derive(Debug, Deserialize)]
struct RawPlace {
    lat: String,
    lon: String,
    display_name: String,
}

impl TryFrom<RawPlace> for GeocodeResult {
    type Error = GeocodeError;

    fn try_from(raw: RawPlace) -> Result<Self> {
        let invalid = || GeocodeError::InvalidCoordinate(format!("({}, {})", raw.lat, raw.lon));

        let latitude = raw.lat.trim().parse::<f64>().map_err(|_| invalid())?;
        let longitude = raw.lon.trim().parse::<f64>().map_err(|_| invalid())?;
        let coordinate = Coordinate::try_new(latitude, longitude).map_err(|_| invalid())?;

        Ok(Self {
            coordinate,
            display_name: raw.display_name,
        })
    }
}

/// Nominatim client with built-in resilience patterns
///
/// This client wraps `reqwest` and adds:
/// - Retry with exponential backoff for transient failures
/// - A circuit breaker that stops hammering a failing provider
/// - Throttling to the provider's published request rate
/// - Request correlation IDs for tracing
#[derive(Clone)]
pub struct NominatimClient {
    inner: Client,
    config: Arc<GeocoderConfig>,
    circuit_breaker: Arc<CircuitBreaker>,
    rate_limiter: Arc<RateLimiter>,
}

impl NominatimClient {
    /// Create a new client with configuration from environment
    pub fn new() -> Result<Self> {
        let config = GeocoderConfig::from_env()?;
        Self::with_config(config)
    }

    /// Create a new client with specific configuration
    pub fn with_config(config: GeocoderConfig) -> Result<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| GeocodeError::config("user_agent is not a valid header value"))?;
        default_headers.insert(USER_AGENT, user_agent);

        let inner = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(GeocodeError::Request)?;

        let circuit_breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default()));
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        Ok(Self {
            inner,
            config: Arc::new(config),
            circuit_breaker,
            rate_limiter,
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &GeocoderConfig {
        &self.config
    }

    /// Get circuit breaker state
    #[must_use]
    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    /// Reset the circuit breaker
    pub fn reset_circuit(&self) {
        self.circuit_breaker.reset();
    }

    /// Look up a query, returning at most one candidate
    #[instrument(skip(self), fields(request_id))]
    pub async fn lookup(&self, query: &str) -> Result<Vec<GeocodeResult>> {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        if !self.circuit_breaker.can_execute() {
            warn!(request_id = %request_id, "Circuit breaker is open, rejecting lookup");
            return Err(GeocodeError::CircuitOpen);
        }

        let timer = Timer::start(names::GEOCODE_LOOKUP_MS);
        let result = self.execute_with_retry(&request_id, query).await;
        timer.stop();
        result
    }

    /// Execute the search with retry logic
    async fn execute_with_retry(&self, request_id: &str, query: &str) -> Result<Vec<GeocodeResult>> {
        let retry_config = &self.config.retry;
        let mut last_error: Option<GeocodeError> = None;

        for attempt in 0..retry_config.max_attempts {
            if attempt > 0 {
                let delay = retry_config.delay_for_attempt(attempt);
                debug!(
                    request_id = %request_id,
                    attempt = attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying after delay"
                );
                tokio::time::sleep(delay).await;
            }

            self.throttle(request_id).await;

            let start = Instant::now();
            let result = self.execute_single_request(request_id, query).await;
            let elapsed = start.elapsed();

            match result {
                Ok(places) => {
                    self.circuit_breaker.record_success();
                    debug!(
                        request_id = %request_id,
                        attempt = attempt + 1,
                        elapsed_ms = elapsed.as_millis(),
                        results = places.len(),
                        "Lookup succeeded"
                    );
                    return Ok(places);
                }
                Err(e) => {
                    if e.is_retryable() {
                        self.circuit_breaker.record_failure();
                    }

                    if e.is_retryable() && attempt + 1 < retry_config.max_attempts {
                        debug!(
                            request_id = %request_id,
                            attempt = attempt + 1,
                            error = %e,
                            "Lookup failed, will retry"
                        );
                        last_error = Some(e);
                    } else if e.is_retryable() && retry_config.max_attempts > 1 {
                        return Err(GeocodeError::RetriesExhausted {
                            attempts: retry_config.max_attempts,
                            last_error: e.to_string(),
                        });
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(GeocodeError::RetriesExhausted {
            attempts: retry_config.max_attempts,
            last_error: last_error.map_or_else(|| "Unknown error".to_string(), |e| e.to_string()),
        })
    }

    /// Wait until the provider's rate allows another request
    async fn throttle(&self, request_id: &str) {
        while !self.rate_limiter.try_acquire(SEARCH_BUCKET) {
            let wait = self
                .rate_limiter
                .time_until_available(SEARCH_BUCKET, 1)
                .max(Duration::from_millis(1));
            debug!(request_id = %request_id, wait_ms = wait.as_millis(), "Throttling lookup");
            tokio::time::sleep(wait).await;
        }
    }

    /// Execute a single request without retry
    async fn execute_single_request(&self, request_id: &str, query: &str) -> Result<Vec<GeocodeResult>> {
        let response = self
            .inner
            .get(self.config.search_url())
            .query(&[
                ("format", "json"),
                ("q", query),
                ("limit", RESULT_LIMIT),
                ("countrycodes", self.config.country_code.as_str()),
            ])
            .header(X_REQUEST_ID, request_id)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        self.handle_response(response).await
    }

    /// Handle HTTP response and deserialize
    async fn handle_response(&self, response: Response) -> Result<Vec<GeocodeResult>> {
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Unknown error").to_string());
            return Err(GeocodeError::api_response(status.as_u16(), message));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        parse_places(&body)
    }

    fn classify(&self, error: reqwest::Error) -> GeocodeError {
        if error.is_timeout() {
            GeocodeError::Timeout(self.config.timeout)
        } else {
            GeocodeError::Request(error)
        }
    }
}

impl GeocodeProvider for NominatimClient {
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<GeocodeResult>>> {
        Box::pin(self.lookup(query))
    }
}

/// Parse the provider's JSON array, keeping only the first element
fn parse_places(body: &str) -> Result<Vec<GeocodeResult>> {
    let raw: Vec<RawPlace> = serde_json::from_str(body)?;
    raw.into_iter().take(1).map(GeocodeResult::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_result_only() {
        let body = r#"[
            {"lat": "43.6534817", "lon": "-79.3839347", "display_name": "Toronto City Hall, Toronto"},
            {"lat": "43.7", "lon": "-79.4", "display_name": "Elsewhere"}
        ]"#;

        let places = parse_places(body).unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].display_name, "Toronto City Hall, Toronto");
        assert!((places[0].coordinate.latitude - 43.653_481_7).abs() < 1e-9);
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_places("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(parse_places(r#"{"error": "oops"}"#), Err(GeocodeError::Json(_))));
    }

    #[test]
    fn test_parse_rejects_bad_coordinates() {
        let body = r#"[{"lat": "north", "lon": "-79.38", "display_name": "x"}]"#;
        assert!(matches!(parse_places(body), Err(GeocodeError::InvalidCoordinate(_))));

        let body = r#"[{"lat": "123.0", "lon": "-79.38", "display_name": "x"}]"#;
        assert!(matches!(parse_places(body), Err(GeocodeError::InvalidCoordinate(_))));
    }

    #[test]
    fn test_client_creation() {
        let client = NominatimClient::with_config(GeocoderConfig::default());
        assert!(client.is_ok());
        assert_eq!(client.unwrap().circuit_state(), CircuitState::Closed);
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = GeocoderConfig::default().with_base_url("ftp://example.com");
        assert!(NominatimClient::with_config(config).is_err());
    }

    #[cfg(feature = "integration")]
    #[tokio::test]
    async fn test_live_lookup() {
        let client = NominatimClient::with_config(GeocoderConfig::default()).unwrap();
        let places = client.lookup("Toronto City Hall, Canada").await.unwrap();
        assert_eq!(places.len(), 1);
    }
}
