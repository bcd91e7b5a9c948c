//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the structural invariants of the cache engine
//! over arbitrary operation sequences.

use proptest::prelude::*;

use crate::cache::{CacheEngine, StatsCollector};
use crate::key::Arg;
use crate::options::Options;

// == Test Configuration ==
const TEST_MAX_SIZE: usize = 3;

// == Strategies ==
/// Generates keys from a small alphabet so sequences collide often
fn key_name_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1}".prop_map(|s| s)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Add { key: String, value: i32 },
    Get { key: String },
    Remove { key: String },
    Clear,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_name_strategy(), any::<i32>())
            .prop_map(|(key, value)| CacheOp::Add { key, value }),
        4 => key_name_strategy().prop_map(|key| CacheOp::Get { key }),
        2 => key_name_strategy().prop_map(|key| CacheOp::Remove { key }),
        1 => Just(CacheOp::Clear),
    ]
}

fn key(name: &str) -> Vec<Arg> {
    vec![Arg::from(name)]
}

fn bounded_engine() -> CacheEngine<i32> {
    CacheEngine::new(Options::default().with_max_size(TEST_MAX_SIZE)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Property: the cache never exceeds its configured bound, and the key
    // and value sequences stay parallel, whatever operations are applied.
    #[test]
    fn prop_size_bound_and_parallel_sequences(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let engine = bounded_engine();

        for op in ops {
            match op {
                CacheOp::Add { key: name, value } => {
                    engine.add(&key(&name), value);
                }
                CacheOp::Get { key: name } => {
                    let _ = engine.get(&key(&name));
                }
                CacheOp::Remove { key: name } => {
                    let _ = engine.remove(&key(&name));
                }
                CacheOp::Clear => engine.clear(),
            }

            let snapshot = engine.snapshot();
            prop_assert!(snapshot.size <= TEST_MAX_SIZE, "size exceeded bound");
            prop_assert_eq!(snapshot.keys.len(), snapshot.values.len(), "sequences diverged");
            prop_assert_eq!(snapshot.keys.len(), snapshot.size, "size out of sync");
        }
    }

    // Property: membership after any operation sequence matches a simple
    // LRU model: adds insert at the front (evicting the tail at capacity),
    // hits move to the front, removes and clears do the obvious thing.
    #[test]
    fn prop_matches_lru_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let engine = bounded_engine();
        let mut model: Vec<String> = Vec::new();

        for op in ops {
            match op {
                CacheOp::Add { key: name, value } => {
                    engine.add(&key(&name), value);
                    if !model.contains(&name) {
                        model.insert(0, name);
                        if model.len() > TEST_MAX_SIZE {
                            model.pop();
                        }
                    }
                }
                CacheOp::Get { key: name } => {
                    let found = engine.get(&key(&name)).is_some();
                    let model_found = model.contains(&name);
                    prop_assert_eq!(found, model_found, "hit/miss diverged from model");
                    if model_found {
                        model.retain(|k| k != &name);
                        model.insert(0, name);
                    }
                }
                CacheOp::Remove { key: name } => {
                    let removed = engine.remove(&key(&name));
                    let model_removed = model.contains(&name);
                    prop_assert_eq!(removed, model_removed, "removal diverged from model");
                    model.retain(|k| k != &name);
                }
                CacheOp::Clear => {
                    engine.clear();
                    model.clear();
                }
            }
        }

        // Final membership and order agree entry by entry
        let keys = engine.keys();
        prop_assert_eq!(keys.len(), model.len());
        for (stored, expected) in keys.iter().zip(&model) {
            prop_assert!(
                crate::key::KeyComparator::Shallow.keys_equal(stored, &key(expected)),
                "order diverged from model"
            );
        }
    }

    // Property: for any sequence of operations, the recorded statistics
    // reflect exactly the lookups made and the hits among them.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let collector = StatsCollector::new();
        collector.enable();
        let engine = CacheEngine::new(
            Options::default()
                .with_max_size(TEST_MAX_SIZE)
                .with_profile_name("property")
                .with_stats_collector(collector),
        )
        .unwrap();

        let mut expected_calls: u64 = 0;
        let mut expected_hits: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Add { key: name, value } => {
                    engine.add(&key(&name), value);
                }
                CacheOp::Get { key: name } => {
                    expected_calls += 1;
                    if engine.get(&key(&name)).is_some() {
                        expected_hits += 1;
                    }
                }
                CacheOp::Remove { key: name } => {
                    let _ = engine.remove(&key(&name));
                }
                CacheOp::Clear => engine.clear(),
            }
        }

        let stats = engine.stats();
        prop_assert_eq!(stats.calls, expected_calls, "calls mismatch");
        prop_assert_eq!(stats.hits, expected_hits, "hits mismatch");
    }

    // Property: seeding an already-present key never duplicates it
    #[test]
    fn prop_add_is_idempotent(name in key_name_strategy(), first in any::<i32>(), second in any::<i32>()) {
        let engine = bounded_engine();

        prop_assert!(engine.add(&key(&name), first));
        prop_assert!(!engine.add(&key(&name), second));

        prop_assert_eq!(engine.len(), 1);
        let value = engine.get(&key(&name)).unwrap();
        prop_assert_eq!(value.ready(), Some(&first));
    }

    // Property: structurally equal composite keys address the same entry
    // under the deep comparator, regardless of which instance is used
    #[test]
    fn prop_deep_key_substitution(values in prop::collection::vec(any::<i64>(), 0..5)) {
        let engine: CacheEngine<usize> =
            CacheEngine::new(Options::default().with_deep_equal()).unwrap();

        let first = vec![Arg::list(values.iter().copied().map(Arg::from).collect::<Vec<_>>())];
        let second = vec![Arg::list(values.iter().copied().map(Arg::from).collect::<Vec<_>>())];

        engine.add(&first, values.len());
        let value = engine.get(&second).unwrap();
        prop_assert_eq!(value.ready(), Some(&values.len()));
    }
}
