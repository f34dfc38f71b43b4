//! Cache Statistics Module
//!
//! Tracks residency and load metrics: hits, misses, evictions, and job outcomes.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of lookups answered from resident entries
    pub hits: u64,
    /// Number of lookups that found nothing resident
    pub misses: u64,
    /// Number of entries evicted to stay within capacity
    pub evictions: u64,
    /// Current number of resident entries
    pub total_entries: usize,
    /// Number of load jobs registered
    pub loads_started: u64,
    /// Number of load jobs that settled as cancelled
    pub loads_cancelled: u64,
    /// Number of failed loads observed by a direct caller
    pub load_failures: u64,
    /// Number of failed loads nobody asked for directly
    pub prefetch_failures: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
