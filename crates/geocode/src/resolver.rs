//! Address to coordinate resolution
//!
//! The resolver sits in front of a [`GeocodeProvider`] and guarantees:
//! - inputs shorter than five characters never reach the network
//! - one provider call per distinct address for the life of the cache
//! - every failure comes back as [`Resolution::NotFound`], never an error
//!
//! Rural or malformed addresses are expected, so "no coordinate" is a normal
//! outcome that callers render as "no proximity banner".

use crate::cache::{normalize_key, GeocodeCache};
use crate::client::NominatimClient;
use crate::config::GeocoderConfig;
use crate::error::Result;
use crate::provider::{GeocodeProvider, GeocodeResult};
use careline_geo::PostalCode;
use careline_telemetry::{metrics, names};
use std::sync::Arc;
use tracing::{debug, warn};

/// Shortest trimmed input worth looking up
pub const MIN_ADDRESS_CHARS: usize = 5;

/// Outcome of a resolution
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The address maps to a place
    Found(GeocodeResult),
    /// No coordinate is available: unmapped, malformed, or the lookup failed
    NotFound,
}

impl Resolution {
    /// True for [`Resolution::Found`]
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// The result, if any
    #[must_use]
    pub fn into_option(self) -> Option<GeocodeResult> {
        match self {
            Self::Found(result) => Some(result),
            Self::NotFound => None,
        }
    }
}

/// Cached, failure-absorbing front end to a geocoder
pub struct CoordinateResolver {
    provider: Arc<dyn GeocodeProvider>,
    cache: Arc<GeocodeCache>,
    country_name: String,
}

impl CoordinateResolver {
    /// Create a resolver over any provider, sharing the given cache
    pub fn new(provider: Arc<dyn GeocodeProvider>, cache: Arc<GeocodeCache>) -> Self {
        Self {
            provider,
            cache,
            country_name: "Canada".to_string(),
        }
    }

    /// Resolver backed by a [`NominatimClient`] and a fresh cache
    pub fn from_config(config: GeocoderConfig) -> Result<Self> {
        let country_name = config.country_name.clone();
        let client = NominatimClient::with_config(config)?;
        Ok(Self::new(Arc::new(client), Arc::new(GeocodeCache::new())).with_country_name(country_name))
    }

    /// Set the country name appended to queries
    #[must_use]
    pub fn with_country_name(mut self, name: impl Into<String>) -> Self {
        self.country_name = name.into();
        self
    }

    /// The cache backing this resolver
    #[must_use]
    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    /// Build the provider query for an address.
    ///
    /// A full postal code is canonicalized to `A1A 1A1`, then the country
    /// name is appended unless the text already mentions it.
    #[must_use]
    pub fn build_query(&self, address: &str) -> String {
        let trimmed = address.trim();
        let base = PostalCode::parse(trimmed).map_or_else(|_| trimmed.to_string(), |code| code.to_string());

        if self.country_name.is_empty()
            || base.to_lowercase().contains(&self.country_name.to_lowercase())
        {
            base
        } else {
            format!("{base}, {}", self.country_name)
        }
    }

    /// Resolve an address or postal code.
    pub async fn resolve(&self, address: &str) -> Resolution {
        let trimmed = address.trim();
        if trimmed.chars().count() < MIN_ADDRESS_CHARS {
            debug!(address = %trimmed, "Address too short to geocode");
            metrics().increment(names::GEOCODE_NOT_FOUND);
            return Resolution::NotFound;
        }

        let key = normalize_key(trimmed);
        if let Some(hit) = self.cache.get(&key) {
            debug!(address = %key, "Geocode cache hit");
            metrics().increment(names::GEOCODE_CACHE_HIT);
            return Resolution::Found(hit);
        }
        metrics().increment(names::GEOCODE_CACHE_MISS);

        let query = self.build_query(trimmed);
        match self.provider.search(&query).await {
            Ok(places) => match places.into_iter().next() {
                Some(place) if !place.coordinate.is_valid() => {
                    warn!(
                        query = %query,
                        latitude = place.coordinate.latitude,
                        longitude = place.coordinate.longitude,
                        "Geocoder returned an out-of-range coordinate, treating as not found"
                    );
                    metrics().increment(names::GEOCODE_NOT_FOUND);
                    Resolution::NotFound
                }
                Some(place) => {
                    debug!(address = %key, display_name = %place.display_name, "Geocoded address");
                    self.cache.insert(key, place.clone());
                    Resolution::Found(place)
                }
                None => {
                    debug!(query = %query, "Geocoder returned no results");
                    metrics().increment(names::GEOCODE_NOT_FOUND);
                    Resolution::NotFound
                }
            },
            Err(e) => {
                warn!(query = %query, kind = e.kind(), error = %e, "Geocoding failed, treating as not found");
                metrics().increment(names::GEOCODE_NOT_FOUND);
                Resolution::NotFound
            }
        }
    }
}
