//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the capacity, recency and accounting guarantees of
//! the entry store and the versioned cache.

use proptest::prelude::*;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{Capacity, EntryStore, VersionedCache};

// == Test Configuration ==
const EPOCH: &str = "master";
const TEST_TTL: Option<Duration> = Some(Duration::from_secs(3600));

fn bounded(max: usize) -> Capacity {
    Capacity::Bounded(NonZeroUsize::new(max).unwrap())
}

// == Strategies ==
/// Generates fingerprints from a small alphabet so that sequences revisit keys
fn fingerprint_strategy() -> impl Strategy<Value = String> {
    "[a-h]{1,2}"
}

#[derive(Debug, Clone)]
enum StoreOp {
    Put { fingerprint: String, value: u32 },
    Get { fingerprint: String },
    Remove { fingerprint: String },
    SwitchEpoch { epoch: String },
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        4 => (fingerprint_strategy(), any::<u32>())
            .prop_map(|(fingerprint, value)| StoreOp::Put { fingerprint, value }),
        3 => fingerprint_strategy().prop_map(|fingerprint| StoreOp::Get { fingerprint }),
        1 => fingerprint_strategy().prop_map(|fingerprint| StoreOp::Remove { fingerprint }),
        1 => "ref[0-2]".prop_map(|epoch| StoreOp::SwitchEpoch { epoch }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Size never exceeds the bound, whatever the mix of operations.
    #[test]
    fn prop_capacity_enforcement(
        max in 1usize..8,
        ops in prop::collection::vec(store_op_strategy(), 1..200)
    ) {
        let mut store = EntryStore::new(bounded(max));
        let mut epoch = EPOCH.to_string();
        let now = Instant::now();

        for op in ops {
            match op {
                StoreOp::Put { fingerprint, value } => {
                    store.put(fingerprint, value, TEST_TTL, epoch.as_str(), now);
                }
                StoreOp::Get { fingerprint } => {
                    store.get(&fingerprint, &epoch, now);
                }
                StoreOp::Remove { fingerprint } => {
                    store.remove(&fingerprint);
                }
                StoreOp::SwitchEpoch { epoch: next } => epoch = next,
            }
            prop_assert!(store.len() <= max, "store size {} exceeds max {}", store.len(), max);
        }
    }

    // Inserting N+1 distinct fingerprints with no reads evicts exactly the first.
    #[test]
    fn prop_lru_evicts_first_inserted(
        fingerprints in prop::collection::hash_set("[a-z]{1,8}", 2..30)
    ) {
        let fingerprints: Vec<String> = fingerprints.into_iter().collect();
        let max = fingerprints.len() - 1;
        let mut store = EntryStore::new(bounded(max));
        let now = Instant::now();

        let mut evicted = Vec::new();
        for (value, fingerprint) in fingerprints.iter().enumerate() {
            if let Some(key) = store.put(fingerprint.clone(), value, TEST_TTL, EPOCH, now) {
                evicted.push(key);
            }
        }

        prop_assert_eq!(evicted, vec![fingerprints[0].clone()]);
        for fingerprint in &fingerprints[1..] {
            prop_assert!(store.contains(fingerprint));
        }
    }

    // A value read back under the same epoch is the last value put.
    #[test]
    fn prop_get_returns_latest_put(
        puts in prop::collection::vec((fingerprint_strategy(), any::<u32>()), 1..50)
    ) {
        let mut store = EntryStore::new(Capacity::Unbounded);
        let mut latest = HashMap::new();
        let now = Instant::now();

        for (fingerprint, value) in &puts {
            store.put(fingerprint.clone(), *value, TEST_TTL, EPOCH, now);
            latest.insert(fingerprint.clone(), *value);
        }

        prop_assert_eq!(store.len(), latest.len());
        for (fingerprint, value) in latest {
            prop_assert_eq!(store.get(&fingerprint, EPOCH, now), Some(&value));
        }
    }

    // Hits plus misses equal lookups, and every miss on a successful compute
    // ran the computation exactly once (no concurrency here).
    #[test]
    fn prop_statistics_accuracy(
        lookups in prop::collection::vec(fingerprint_strategy(), 1..60),
        max in 1usize..6
    ) {
        let cache: VersionedCache<String, String> = VersionedCache::new(bounded(max), None, EPOCH);
        let mut computations = 0u64;

        tokio_test::block_on(async {
            for fingerprint in &lookups {
                cache
                    .get_or_compute(fingerprint, |_| {
                        computations += 1;
                        async { Ok::<_, String>(fingerprint.clone()) }
                    })
                    .await
                    .unwrap();
            }
        });

        let stats = cache.stats();
        prop_assert_eq!(stats.hits + stats.misses, lookups.len() as u64);
        prop_assert_eq!(stats.misses, computations);
        prop_assert!(stats.total_entries <= max);
        prop_assert_eq!(stats.total_entries, cache.len());
        prop_assert!(stats.evictions <= stats.misses);
    }
}
