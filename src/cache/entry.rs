//! Cache Entry Module
//!
//! Defines the structure for individual resident assets.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A decoded asset plus the bookkeeping used for eviction ordering.
///
/// Entries are never mutated once created; a re-insert replaces the entry.
#[derive(Debug)]
pub struct CacheEntry<A> {
    /// The decoded asset, shared with every caller that received it
    pub asset: Arc<A>,
    /// Monotonic insertion sequence number
    pub seq: u64,
    /// Insertion timestamp (Unix milliseconds)
    pub inserted_at: u64,
}

impl<A> CacheEntry<A> {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(asset: Arc<A>, seq: u64) -> Self {
        Self {
            asset,
            seq,
            inserted_at: current_timestamp_ms(),
        }
    }
}

impl<A> Clone for CacheEntry<A> {
    fn clone(&self) -> Self {
        Self {
            asset: Arc::clone(&self.asset),
            seq: self.seq,
            inserted_at: self.inserted_at,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
