//! Cache Statistics Module
//!
//! Tracks calls and hits per named profile, behind a process-wide opt-in
//! toggle.
//!
//! The collector is explicit shared state: every cache engine holds a
//! cloneable handle, defaulting to the process-wide collector from
//! [`StatsCollector::global`] but injectable per instance. Recording is a
//! no-op while collection is disabled; counters reset only on explicit
//! clear.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use serde::Serialize;

// == Stats Profile ==
/// Counters for one named profile.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatsProfile {
    /// Number of cache accesses
    pub calls: u64,
    /// Number of accesses answered from cache
    pub hits: u64,
}

impl StatsProfile {
    // == Usage ==
    /// Returns the hit percentage, or 0.0 if no calls have been recorded.
    pub fn usage(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.hits as f64 / self.calls as f64 * 100.0
        }
    }
}

// == Stats Snapshot ==
/// A point-in-time view of one profile, or of the aggregate across all
/// profiles when `profile_name` is None.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Profile the snapshot describes, None for the aggregate
    pub profile_name: Option<String>,
    /// Number of cache accesses
    pub calls: u64,
    /// Number of accesses answered from cache
    pub hits: u64,
    /// Hit percentage
    pub usage: f64,
}

// == Stats Collector ==
/// Cloneable handle to a set of profile counters.
#[derive(Debug, Clone, Default)]
pub struct StatsCollector {
    inner: Arc<StatsInner>,
}

#[derive(Debug, Default)]
struct StatsInner {
    /// Collection toggle; recording is a no-op while false
    enabled: AtomicBool,
    /// Source of generated profile names for unnamed caches
    next_profile_id: AtomicU64,
    /// Counters per profile name
    profiles: Mutex<HashMap<String, StatsProfile>>,
}

impl StatsCollector {
    // == Constructor ==
    /// Creates an independent collector, useful for isolated tests.
    pub fn new() -> Self {
        Self::default()
    }

    // == Global ==
    /// Returns a handle to the process-wide collector.
    pub fn global() -> Self {
        static GLOBAL: OnceLock<StatsCollector> = OnceLock::new();
        GLOBAL.get_or_init(StatsCollector::new).clone()
    }

    // == Lifecycle ==
    /// Enables collection.
    pub fn enable(&self) {
        self.inner.enabled.store(true, Ordering::Relaxed);
    }

    /// Disables collection; existing counters are kept but frozen.
    pub fn disable(&self) {
        self.inner.enabled.store(false, Ordering::Relaxed);
    }

    /// Returns true while collection is enabled.
    pub fn is_collecting(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    // == Profile Names ==
    /// Returns a generated profile name for a cache created without one.
    pub fn next_profile_name(&self) -> String {
        let id = self.inner.next_profile_id.fetch_add(1, Ordering::Relaxed);
        format!("memofn-{id}")
    }

    // == Record Call ==
    /// Records one access against `profile`.
    pub fn record_call(&self, profile: &str) {
        if !self.is_collecting() {
            return;
        }

        let mut profiles = self.lock_profiles();
        profiles.entry(profile.to_string()).or_default().calls += 1;
    }

    // == Record Hit ==
    /// Records one cache hit against `profile`.
    pub fn record_hit(&self, profile: &str) {
        if !self.is_collecting() {
            return;
        }

        let mut profiles = self.lock_profiles();
        profiles.entry(profile.to_string()).or_default().hits += 1;
    }

    // == Get Stats ==
    /// Returns the counters for `profile`, or the aggregate across every
    /// profile when None is given.
    pub fn get_stats(&self, profile: Option<&str>) -> StatsSnapshot {
        let profiles = self.lock_profiles();

        let (name, counters) = match profile {
            Some(name) => (
                Some(name.to_string()),
                profiles.get(name).copied().unwrap_or_default(),
            ),
            None => {
                let mut aggregate = StatsProfile::default();
                for counters in profiles.values() {
                    aggregate.calls += counters.calls;
                    aggregate.hits += counters.hits;
                }
                (None, aggregate)
            }
        };

        StatsSnapshot {
            profile_name: name,
            calls: counters.calls,
            hits: counters.hits,
            usage: counters.usage(),
        }
    }

    // == Clear ==
    /// Resets the counters for `profile`, or every profile when None.
    pub fn clear(&self, profile: Option<&str>) {
        let mut profiles = self.lock_profiles();
        match profile {
            Some(name) => {
                profiles.remove(name);
            }
            None => profiles.clear(),
        }
    }

    fn lock_profiles(&self) -> std::sync::MutexGuard<'_, HashMap<String, StatsProfile>> {
        self.inner.profiles.lock().expect("stats lock poisoned")
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_collector_records_nothing() {
        let collector = StatsCollector::new();

        collector.record_call("profile");
        collector.record_hit("profile");

        let stats = collector.get_stats(Some("profile"));
        assert_eq!(stats.calls, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.usage, 0.0);
    }

    #[test]
    fn test_enabled_collector_counts_per_profile() {
        let collector = StatsCollector::new();
        collector.enable();

        collector.record_call("a");
        collector.record_call("a");
        collector.record_hit("a");
        collector.record_call("b");

        let a = collector.get_stats(Some("a"));
        assert_eq!(a.calls, 2);
        assert_eq!(a.hits, 1);
        assert_eq!(a.usage, 50.0);

        let b = collector.get_stats(Some("b"));
        assert_eq!(b.calls, 1);
        assert_eq!(b.hits, 0);
    }

    #[test]
    fn test_aggregate_across_profiles() {
        let collector = StatsCollector::new();
        collector.enable();

        collector.record_call("a");
        collector.record_hit("a");
        collector.record_call("b");

        let aggregate = collector.get_stats(None);
        assert_eq!(aggregate.profile_name, None);
        assert_eq!(aggregate.calls, 2);
        assert_eq!(aggregate.hits, 1);
        assert_eq!(aggregate.usage, 50.0);
    }

    #[test]
    fn test_disable_freezes_counters() {
        let collector = StatsCollector::new();
        collector.enable();
        collector.record_call("a");

        collector.disable();
        collector.record_call("a");

        assert_eq!(collector.get_stats(Some("a")).calls, 1);
    }

    #[test]
    fn test_clear_single_profile() {
        let collector = StatsCollector::new();
        collector.enable();
        collector.record_call("a");
        collector.record_call("b");

        collector.clear(Some("a"));

        assert_eq!(collector.get_stats(Some("a")).calls, 0);
        assert_eq!(collector.get_stats(Some("b")).calls, 1);
    }

    #[test]
    fn test_clear_everything() {
        let collector = StatsCollector::new();
        collector.enable();
        collector.record_call("a");
        collector.record_call("b");

        collector.clear(None);

        assert_eq!(collector.get_stats(None).calls, 0);
    }

    #[test]
    fn test_generated_profile_names_are_unique() {
        let collector = StatsCollector::new();

        let first = collector.next_profile_name();
        let second = collector.next_profile_name();
        assert_ne!(first, second);
    }

    #[test]
    fn test_usage_no_calls() {
        assert_eq!(StatsProfile::default().usage(), 0.0);
    }
}
