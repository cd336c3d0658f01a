//! In-process geocode cache
//!
//! Append-only and unbounded: the number of distinct addresses seen in one
//! process is small, and an address does not move. Concurrent lookups of the
//! same address may both insert; they carry equivalent results, so the last
//! writer simply wins.

use crate::provider::GeocodeResult;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache key for an address: trimmed and lower-cased
#[must_use]
pub fn normalize_key(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Geocode results keyed by normalized address
#[derive(Default)]
pub struct GeocodeCache {
    entries: RwLock<HashMap<String, GeocodeResult>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl GeocodeCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a normalized key, counting the hit or miss
    pub fn get(&self, key: &str) -> Option<GeocodeResult> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let found = entries.get(key).cloned();

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);

        found
    }

    /// Store a result under a normalized key
    pub fn insert(&self, key: String, result: GeocodeResult) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, result);
    }

    /// Store a known result for a raw address, e.g. one already held in the
    /// booking record
    pub fn seed(&self, address: &str, result: GeocodeResult) {
        self.insert(normalize_key(address), result);
    }

    /// Number of cached addresses
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Cached addresses
    pub entries: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that missed
    pub misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_geo::Coordinate;

    fn city_hall() -> GeocodeResult {
        GeocodeResult {
            coordinate: Coordinate::new(43.6532, -79.3832),
            display_name: "Toronto City Hall, Toronto, Ontario, Canada".to_string(),
        }
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  100 Queen St W, Toronto \n"), "100 queen st w, toronto");
    }

    #[test]
    fn test_get_counts_hits_and_misses() {
        let cache = GeocodeCache::new();
        assert!(cache.get("100 queen st w").is_none());

        cache.seed(" 100 Queen St W ", city_hall());
        assert_eq!(cache.get("100 queen st w"), Some(city_hall()));

        let stats = cache.stats();
        assert_eq!(stats, CacheStats { entries: 1, hits: 1, misses: 1 });
    }

    #[test]
    fn test_last_writer_wins() {
        let cache = GeocodeCache::new();
        cache.insert("key".into(), city_hall());

        let mut moved = city_hall();
        moved.display_name = "City Hall".into();
        cache.insert("key".into(), moved.clone());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("key"), Some(moved));
    }
}
