//! The seam between the resolver and whoever answers geocoding queries

use crate::error::Result;
use careline_geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`GeocodeProvider`] methods
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A resolved place: where it is and what the provider calls it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResult {
    /// Location of the place
    pub coordinate: Coordinate,
    /// Provider's full name for the place
    pub display_name: String,
}

/// A forward geocoder
///
/// Implementations issue exactly one logical lookup per call (retries of
/// transient failures included) and return candidates best match first.
pub trait GeocodeProvider: Send + Sync + 'static {
    /// Resolve a free-form query to candidate places
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<GeocodeResult>>>;
}
