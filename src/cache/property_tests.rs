//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check boundedness, FIFO eviction and pinning of the store.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::CacheStore;

// == Strategies ==
/// Generates asset identifiers shaped like image paths
fn key_strategy() -> impl Strategy<Value = String> {
    "/img/[a-z]{1,6}\\.png".prop_map(|s| s)
}

/// Generates a sequence of store operations for testing
#[derive(Debug, Clone)]
enum StoreOp {
    Put { key: String },
    Get { key: String },
    Remove { key: String },
    Pin { key: String },
    Unpin { key: String },
    Clear,
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        4 => key_strategy().prop_map(|key| StoreOp::Put { key }),
        2 => key_strategy().prop_map(|key| StoreOp::Get { key }),
        1 => key_strategy().prop_map(|key| StoreOp::Remove { key }),
        1 => key_strategy().prop_map(|key| StoreOp::Pin { key }),
        1 => key_strategy().prop_map(|key| StoreOp::Unpin { key }),
        1 => Just(StoreOp::Clear),
    ]
}

fn unique(keys: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // The store never holds more than its capacity, whatever the operation mix.
    #[test]
    fn prop_size_never_exceeds_capacity(
        capacity in 1usize..8,
        ops in prop::collection::vec(store_op_strategy(), 1..80)
    ) {
        let mut store: CacheStore<String, String> = CacheStore::new(capacity);

        for op in ops {
            match op {
                StoreOp::Put { key } => {
                    let asset = Arc::new(key.clone());
                    store.put(key, asset);
                }
                StoreOp::Get { key } => {
                    store.try_get(&key);
                }
                StoreOp::Remove { key } => {
                    store.remove(&key);
                }
                StoreOp::Pin { key } => store.pin(&key),
                StoreOp::Unpin { key } => store.unpin(&key),
                StoreOp::Clear => {
                    store.clear();
                }
            }
            prop_assert!(store.len() <= capacity, "store grew past capacity");
            prop_assert_eq!(store.stats().total_entries, store.len());
        }
    }

    // Filling past capacity evicts exactly the earliest insertions.
    #[test]
    fn prop_fifo_eviction_order(
        keys in prop::collection::vec(key_strategy(), 2..20),
        capacity in 1usize..6
    ) {
        let keys = unique(keys);
        let mut store: CacheStore<String, String> = CacheStore::new(capacity);

        for key in &keys {
            store.put(key.clone(), Arc::new(key.clone()));
        }

        let expected: Vec<String> = keys
            .iter()
            .skip(keys.len().saturating_sub(capacity))
            .cloned()
            .collect();
        prop_assert_eq!(store.keys(), expected);
        prop_assert_eq!(
            store.stats().evictions as usize,
            keys.len().saturating_sub(capacity)
        );
    }

    // A pinned key is never the eviction victim.
    #[test]
    fn prop_pinned_key_survives(
        keys in prop::collection::vec(key_strategy(), 3..20),
        pin_index in 0usize..100
    ) {
        let keys = unique(keys);
        prop_assume!(keys.len() >= 3);

        let capacity = 2;
        let pinned = keys[pin_index % keys.len()].clone();
        let mut store: CacheStore<String, String> = CacheStore::new(capacity);
        store.pin(&pinned);

        let mut inserted_pinned = false;
        for key in &keys {
            store.put(key.clone(), Arc::new(key.clone()));
            if *key == pinned {
                inserted_pinned = store.contains(&pinned);
            }
            if inserted_pinned {
                prop_assert!(store.contains(&pinned), "pinned key '{}' was evicted", pinned);
            }
            prop_assert!(store.len() <= capacity);
        }
        prop_assert!(inserted_pinned);
    }

    // Every get after a put of the same key (with nothing in between) hits.
    #[test]
    fn prop_put_then_get_hits(key in key_strategy(), capacity in 1usize..5) {
        let mut store: CacheStore<String, String> = CacheStore::new(capacity);
        let asset = Arc::new(format!("decoded {}", key));

        store.put(key.clone(), Arc::clone(&asset));
        let got = store.try_get(&key);

        prop_assert!(got.is_some());
        prop_assert!(Arc::ptr_eq(&got.unwrap(), &asset));
        prop_assert_eq!(store.stats().hits, 1);
    }
}
