//! Expiration Scheduler Module
//!
//! Bookkeeping for per-entry TTL timers.
//!
//! Lifecycle per key: Unscheduled -> Armed -> (Fired | Cancelled). An armed
//! key is an entry in the scheduler list; both terminal transitions remove
//! it. Re-arming an armed key cancels the previous timer first, so at most
//! one timer is ever active per key. Each arming gets a fresh generation
//! number; a timer task must validate its generation before acting, which
//! makes a fire racing a cancellation (or a manual clear) a silent no-op:
//! a cancelled timer never evicts anything.
//!
//! The scheduler owns the timers but references keys by value-equality
//! only. The timer tasks themselves are spawned by the cache engine (they
//! need to re-lock it); the scheduler only aborts the handles it holds,
//! including all of them when dropped.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::key::{Arg, CacheKey, KeyComparator};

// == Expiration ==
/// One armed expiration: a key, its deadline, and the timer driving it.
#[derive(Debug)]
struct Expiration {
    /// Key of the entry this expiration will evict
    key: CacheKey,
    /// Generation token validated by the timer task before firing
    generation: u64,
    /// Monotonic deadline, checked lazily on lookup
    deadline: Instant,
    /// Wall-clock deadline, surfaced in snapshots
    expires_at: DateTime<Utc>,
    /// Timer task; None when no async runtime was available to spawn one
    timer: Option<JoinHandle<()>>,
}

// == Expiration Snapshot ==
/// Read-only view of one armed expiration.
#[derive(Debug, Clone, Serialize)]
pub struct ExpirationSnapshot {
    /// Key of the entry the expiration targets
    pub key: CacheKey,
    /// Wall-clock time at which the entry is due to expire
    pub expires_at: DateTime<Utc>,
}

// == Expiration Scheduler ==
/// Ordered list of armed expirations, at most one per key.
#[derive(Debug, Default)]
pub struct ExpirationScheduler {
    expirations: Vec<Expiration>,
    next_generation: u64,
}

impl ExpirationScheduler {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Arm ==
    /// Arms an expiration for `key` that is due after `max_age`,
    /// cancelling any expiration previously armed for an equal key.
    ///
    /// Returns the generation token the caller must hand to the timer task
    /// it spawns for this arming.
    pub fn arm(&mut self, comparator: KeyComparator, key: CacheKey, max_age: Duration) -> u64 {
        self.cancel(comparator, &key);

        let generation = self.next_generation;
        self.next_generation += 1;

        let expires_at = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.expirations.push(Expiration {
            key,
            generation,
            deadline: Instant::now() + max_age,
            expires_at,
            timer: None,
        });

        generation
    }

    // == Attach Timer ==
    /// Records the spawned timer task for a prior arming. If that arming
    /// has already been cancelled or replaced, the task is aborted instead.
    pub fn attach_timer(&mut self, generation: u64, timer: JoinHandle<()>) {
        match self
            .expirations
            .iter_mut()
            .find(|expiration| expiration.generation == generation)
        {
            Some(expiration) => expiration.timer = Some(timer),
            None => timer.abort(),
        }
    }

    // == Cancel ==
    /// Cancels the expiration armed for an equal key, if any. The timer is
    /// aborted and will never fire.
    pub fn cancel(&mut self, comparator: KeyComparator, key: &[Arg]) -> bool {
        match self.find_index(comparator, key) {
            Some(index) => {
                let expiration = self.expirations.remove(index);
                if let Some(timer) = expiration.timer {
                    timer.abort();
                }
                debug!("cancelled expiration (generation={})", expiration.generation);
                true
            }
            None => false,
        }
    }

    /// Cancels every armed expiration.
    pub fn cancel_all(&mut self) {
        for expiration in self.expirations.drain(..) {
            if let Some(timer) = expiration.timer {
                timer.abort();
            }
        }
    }

    // == Complete ==
    /// Marks a fired expiration as done, removing it. A stale generation
    /// (cancelled or re-armed since the timer was spawned) is a no-op.
    pub fn complete(&mut self, comparator: KeyComparator, key: &[Arg], generation: u64) -> bool {
        if !self.is_current(comparator, key, generation) {
            return false;
        }
        self.cancel(comparator, key)
    }

    // == Is Current ==
    /// Returns true when `generation` is still the active arming for an
    /// equal key.
    pub fn is_current(&self, comparator: KeyComparator, key: &[Arg], generation: u64) -> bool {
        self.find_index(comparator, key)
            .map(|index| self.expirations[index].generation == generation)
            .unwrap_or(false)
    }

    // == Is Past Deadline ==
    /// Returns true when an expiration is armed for an equal key and its
    /// deadline has elapsed. Consulted lazily on lookup so an entry past
    /// its deadline is never served, even if its timer task has not run.
    pub fn is_past_deadline(&self, comparator: KeyComparator, key: &[Arg]) -> bool {
        self.find_index(comparator, key)
            .map(|index| Instant::now() >= self.expirations[index].deadline)
            .unwrap_or(false)
    }

    // == Length ==
    /// Returns the number of armed expirations.
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.expirations.len()
    }

    /// Returns true when nothing is armed.
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.expirations.is_empty()
    }

    // == Snapshot ==
    /// Returns a copy of the armed expirations.
    pub fn snapshot(&self) -> Vec<ExpirationSnapshot> {
        self.expirations
            .iter()
            .map(|expiration| ExpirationSnapshot {
                key: expiration.key.clone(),
                expires_at: expiration.expires_at,
            })
            .collect()
    }

    fn find_index(&self, comparator: KeyComparator, key: &[Arg]) -> Option<usize> {
        self.expirations
            .iter()
            .position(|expiration| comparator.keys_equal(&expiration.key, key))
    }
}

impl Drop for ExpirationScheduler {
    fn drop(&mut self) {
        // A dropped cache must not leave timers sleeping toward it
        self.cancel_all();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const CMP: KeyComparator = KeyComparator::Shallow;

    fn key(name: &str) -> CacheKey {
        vec![Arg::from(name)]
    }

    #[test]
    fn test_arm_and_query() {
        let mut scheduler = ExpirationScheduler::new();

        let generation = scheduler.arm(CMP, key("a"), Duration::from_secs(60));

        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.is_current(CMP, &key("a"), generation));
        assert!(!scheduler.is_past_deadline(CMP, &key("a")));
    }

    #[test]
    fn test_rearm_replaces_previous_generation() {
        let mut scheduler = ExpirationScheduler::new();

        let first = scheduler.arm(CMP, key("a"), Duration::from_secs(60));
        let second = scheduler.arm(CMP, key("a"), Duration::from_secs(60));

        // One active expiration per key, and only the newest generation counts
        assert_eq!(scheduler.len(), 1);
        assert!(!scheduler.is_current(CMP, &key("a"), first));
        assert!(scheduler.is_current(CMP, &key("a"), second));
    }

    #[test]
    fn test_cancel_removes_expiration() {
        let mut scheduler = ExpirationScheduler::new();

        let generation = scheduler.arm(CMP, key("a"), Duration::from_secs(60));

        assert!(scheduler.cancel(CMP, &key("a")));
        assert!(scheduler.is_empty());
        assert!(!scheduler.is_current(CMP, &key("a"), generation));
        assert!(!scheduler.cancel(CMP, &key("a")));
    }

    #[test]
    fn test_complete_requires_current_generation() {
        let mut scheduler = ExpirationScheduler::new();

        let stale = scheduler.arm(CMP, key("a"), Duration::from_secs(60));
        let current = scheduler.arm(CMP, key("a"), Duration::from_secs(60));

        assert!(!scheduler.complete(CMP, &key("a"), stale));
        assert_eq!(scheduler.len(), 1);

        assert!(scheduler.complete(CMP, &key("a"), current));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_past_deadline_boundary() {
        let mut scheduler = ExpirationScheduler::new();

        scheduler.arm(CMP, key("a"), Duration::ZERO);

        // Deadline of "now" counts as elapsed
        assert!(scheduler.is_past_deadline(CMP, &key("a")));
        assert!(!scheduler.is_past_deadline(CMP, &key("b")));
    }

    #[test]
    fn test_cancel_all() {
        let mut scheduler = ExpirationScheduler::new();

        scheduler.arm(CMP, key("a"), Duration::from_secs(60));
        scheduler.arm(CMP, key("b"), Duration::from_secs(60));
        scheduler.cancel_all();

        assert!(scheduler.is_empty());
        assert!(scheduler.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_carries_keys_and_deadlines() {
        let mut scheduler = ExpirationScheduler::new();

        scheduler.arm(CMP, key("a"), Duration::from_secs(60));
        let snapshot = scheduler.snapshot();

        assert_eq!(snapshot.len(), 1);
        assert!(CMP.keys_equal(&snapshot[0].key, &key("a")));
        assert!(snapshot[0].expires_at > Utc::now());
    }
}
