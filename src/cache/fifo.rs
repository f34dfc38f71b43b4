//! FIFO Tracker Module
//!
//! Tracks insertion order of resident keys for eviction.

use std::collections::VecDeque;

// == FIFO Tracker ==
/// Tracks insertion order for FIFO eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Oldest insertion
/// - Back = Newest insertion
///
/// Reads never reorder keys.
#[derive(Debug)]
pub struct FifoTracker<K> {
    /// Order of keys by insertion time
    order: VecDeque<K>,
}

impl<K> Default for FifoTracker<K> {
    fn default() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }
}

impl<K: PartialEq> FifoTracker<K> {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push ==
    /// Records a newly inserted key as the newest entry.
    ///
    /// A key already tracked keeps its original slot.
    pub fn push(&mut self, key: K) {
        if !self.contains(&key) {
            self.order.push_back(key);
        }
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &K) {
        self.order.retain(|k| k != key);
    }

    // == Evict Oldest ==
    /// Returns and removes the oldest key for which `evictable` holds.
    ///
    /// Returns None if no tracked key qualifies.
    pub fn evict_oldest_where(&mut self, mut evictable: impl FnMut(&K) -> bool) -> Option<K> {
        let index = self.order.iter().position(|k| evictable(k))?;
        self.order.remove(index)
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &K) -> bool {
        self.order.iter().any(|k| k == key)
    }
}
