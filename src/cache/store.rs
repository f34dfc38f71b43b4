//! Cache Store Module
//!
//! Bounded key -> decoded asset table with FIFO eviction and pinning.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, FifoTracker};

// == Cache Store ==
/// Bounded storage of decoded assets.
///
/// Holds at most `max_entries` entries at all times. When full, inserting
/// evicts the earliest-inserted entry that is neither pinned nor the key
/// being inserted.
#[derive(Debug)]
pub struct CacheStore<K, A> {
    /// Resident assets
    entries: HashMap<K, CacheEntry<A>>,
    /// Insertion order tracker
    fifo: FifoTracker<K>,
    /// Pin counts of keys that must survive eviction
    pinned: HashMap<K, usize>,
    /// Eviction and residency statistics
    stats: CacheStats,
    /// Lookup counters; atomic so lookups only need shared access
    hits: AtomicU64,
    misses: AtomicU64,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Next insertion sequence number
    next_seq: u64,
}

impl<K, A> CacheStore<K, A>
where
    K: Clone + Eq + Hash + Debug,
{
    // == Constructor ==
    /// Creates a new CacheStore holding at most `max_entries` assets.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            fifo: FifoTracker::new(),
            pinned: HashMap::new(),
            stats: CacheStats::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            max_entries: max_entries.max(1),
            next_seq: 0,
        }
    }

    // == Try Get ==
    /// Looks up a resident asset, recording a hit or miss.
    ///
    /// Takes `&self`, so any number of lookups can run under a read lock.
    pub fn try_get(&self, key: &K) -> Option<Arc<A>> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&entry.asset))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    // == Peek ==
    /// Looks up a resident asset without touching statistics.
    pub fn peek(&self, key: &K) -> Option<Arc<A>> {
        self.entries.get(key).map(|entry| Arc::clone(&entry.asset))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    // == Put ==
    /// Inserts a decoded asset, evicting the oldest eligible entries first.
    ///
    /// Re-inserting a resident key replaces its asset but keeps its FIFO slot.
    /// Returns `false` if the store is full of pinned entries, in which case
    /// the asset is not retained.
    pub fn put(&mut self, key: K, asset: Arc<A>) -> bool {
        if let Some(existing) = self.entries.get(&key) {
            let seq = existing.seq;
            self.entries.insert(key, CacheEntry::new(asset, seq));
            return true;
        }

        while self.entries.len() >= self.max_entries {
            let pinned = &self.pinned;
            let victim = self
                .fifo
                .evict_oldest_where(|k| *k != key && !pinned.contains_key(k));

            match victim {
                Some(victim) => {
                    self.entries.remove(&victim);
                    self.stats.record_eviction();
                    debug!("Evicted {:?} to make room for {:?}", victim, key);
                }
                None => {
                    debug!("All resident entries pinned, not retaining {:?}", key);
                    return false;
                }
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(key.clone(), CacheEntry::new(asset, seq));
        self.fifo.push(key);
        self.stats.set_total_entries(self.entries.len());
        true
    }

    // == Remove ==
    /// Removes a resident entry. Returns whether it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        if self.entries.remove(key).is_some() {
            self.fifo.remove(key);
            self.stats.set_total_entries(self.entries.len());
            true
        } else {
            false
        }
    }

    // == Clear ==
    /// Removes every resident entry. Pins are left untouched.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.fifo.clear();
        self.stats.set_total_entries(0);
        count
    }

    // == Pinning ==
    /// Protects `key` from eviction until a matching `unpin`.
    ///
    /// Pins are counted, and a key may be pinned before it is resident.
    pub fn pin(&mut self, key: &K) {
        *self.pinned.entry(key.clone()).or_insert(0) += 1;
    }

    pub fn unpin(&mut self, key: &K) {
        if let Some(count) = self.pinned.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                self.pinned.remove(key);
            }
        }
    }

    pub fn is_pinned(&self, key: &K) -> bool {
        self.pinned.contains_key(key)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.hits = self.hits.load(Ordering::Relaxed);
        stats.misses = self.misses.load(Ordering::Relaxed);
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Resident keys, oldest first.
    pub fn keys(&self) -> Vec<K> {
        let mut entries: Vec<(&K, u64)> = self.entries.iter().map(|(k, e)| (k, e.seq)).collect();
        entries.sort_by_key(|(_, seq)| *seq);
        entries.into_iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(capacity: usize, keys: &[&str]) -> CacheStore<String, String> {
        let mut store = CacheStore::new(capacity);
        for key in keys {
            assert!(store.put(key.to_string(), Arc::new(format!("asset_{}", key))));
        }
        store
    }

    #[test]
    fn test_store_new() {
        let store: CacheStore<String, String> = CacheStore::new(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
    }

    #[test]
    fn test_store_zero_capacity_holds_one() {
        let store = store_with(0, &["a"]);
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_put_and_get() {
        let store = store_with(100, &["key1"]);

        let asset = store.try_get(&"key1".to_string()).unwrap();
        assert_eq!(asset.as_str(), "asset_key1");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let store: CacheStore<String, String> = CacheStore::new(100);
        assert!(store.try_get(&"nonexistent".to_string()).is_none());
    }

    #[test]
    fn test_store_remove() {
        let mut store = store_with(100, &["key1"]);

        assert!(store.remove(&"key1".to_string()));
        assert!(!store.remove(&"key1".to_string()));
        assert!(store.is_empty());
        assert!(store.try_get(&"key1".to_string()).is_none());
    }

    #[test]
    fn test_store_overwrite_keeps_slot() {
        let mut store = store_with(2, &["key1", "key2"]);

        store.put("key1".to_string(), Arc::new("fresh".to_string()));
        assert_eq!(store.peek(&"key1".to_string()).unwrap().as_str(), "fresh");
        assert_eq!(store.len(), 2);

        // key1 is still the oldest insertion
        store.put("key3".to_string(), Arc::new("asset_key3".to_string()));
        assert!(!store.contains(&"key1".to_string()));
        assert!(store.contains(&"key2".to_string()));
    }

    #[test]
    fn test_store_fifo_eviction() {
        let mut store = store_with(3, &["key1", "key2", "key3"]);

        // Cache is full, adding key4 should evict key1 (oldest)
        store.put("key4".to_string(), Arc::new("asset_key4".to_string()));

        assert_eq!(store.len(), 3);
        assert_eq!(store.keys(), vec!["key2", "key3", "key4"]);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_reads_do_not_reorder() {
        let mut store = store_with(3, &["key1", "key2", "key3"]);

        // Reading key1 does not protect it under FIFO
        store.try_get(&"key1".to_string()).unwrap();
        store.put("key4".to_string(), Arc::new("asset_key4".to_string()));

        assert!(!store.contains(&"key1".to_string()));
    }

    #[test]
    fn test_store_pinned_entry_survives_eviction() {
        let mut store = store_with(2, &["a", "b"]);
        store.pin(&"a".to_string());

        store.put("c".to_string(), Arc::new("asset_c".to_string()));

        assert!(store.contains(&"a".to_string()));
        assert!(!store.contains(&"b".to_string()));
        assert!(store.contains(&"c".to_string()));
    }

    #[test]
    fn test_store_all_pinned_rejects_insert() {
        let mut store = store_with(2, &["a", "b"]);
        store.pin(&"a".to_string());
        store.pin(&"b".to_string());

        let retained = store.put("c".to_string(), Arc::new("asset_c".to_string()));

        assert!(!retained);
        assert_eq!(store.len(), 2);
        assert!(!store.contains(&"c".to_string()));
    }

    #[test]
    fn test_store_pins_are_counted() {
        let mut store: CacheStore<String, String> = CacheStore::new(4);
        let key = "a".to_string();

        store.pin(&key);
        store.pin(&key);
        store.unpin(&key);
        assert!(store.is_pinned(&key));

        store.unpin(&key);
        assert!(!store.is_pinned(&key));

        // Unpinning an unpinned key is a no-op
        store.unpin(&key);
        assert!(!store.is_pinned(&key));
    }

    #[test]
    fn test_store_stats() {
        let store = store_with(100, &["key1"]);

        store.try_get(&"key1".to_string()); // hit
        store.try_get(&"nonexistent".to_string()); // miss
        store.peek(&"key1".to_string()); // not counted

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_store_clear() {
        let mut store = store_with(10, &["a", "b", "c"]);
        store.pin(&"a".to_string());

        assert_eq!(store.clear(), 3);
        assert!(store.is_empty());
        assert!(store.keys().is_empty());
        assert!(store.is_pinned(&"a".to_string()));
    }
}
