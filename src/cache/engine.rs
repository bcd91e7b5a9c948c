//! Cache Engine Module
//!
//! Orchestrates the key store, key comparator, expiration scheduler, and
//! stats collector behind one shared handle.
//!
//! All structural state lives under a single mutex so the two parallel
//! sequences and the scheduler always mutate together. The lock is held
//! only for short critical sections, never across an await or a call into
//! user code: observers, expiration hooks, and timer spawning all run after
//! the lock is released. Timer and reconciliation tasks hold a `Weak`
//! reference back to the engine and re-resolve key positions by equality,
//! never by a cached index.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, trace};

use crate::cache::expiration::{ExpirationScheduler, ExpirationSnapshot};
use crate::cache::reconcile;
use crate::cache::stats::{StatsCollector, StatsSnapshot};
use crate::cache::store::KeyStore;
use crate::cache::CachedValue;
use crate::error::Result;
use crate::key::{serialize_key, Arg, CacheKey, KeyComparator};
use crate::options::Options;

// == Cache Snapshot ==
/// Point-in-time copy of the cache contents handed to observers and
/// introspection callers. Never a live view; mutating it has no effect on
/// the cache.
#[derive(Debug, Clone)]
pub struct CacheSnapshot<V> {
    /// Cache keys, most recently used first
    pub keys: Vec<CacheKey>,
    /// Stored values, parallel to `keys`
    pub values: Vec<CachedValue<V>>,
    /// Number of entries at snapshot time
    pub size: usize,
}

// == Cache Engine ==
/// Shared handle to one memoization cache.
pub struct CacheEngine<V> {
    pub(crate) inner: Arc<EngineInner<V>>,
}

pub(crate) struct EngineInner<V> {
    state: Mutex<EngineState<V>>,
    options: Options<V>,
    comparator: KeyComparator,
    profile_name: String,
    stats: StatsCollector,
}

struct EngineState<V> {
    store: KeyStore<V>,
    scheduler: ExpirationScheduler,
}

/// Work queued during a critical section and carried out after unlock:
/// observer callbacks and timer spawns must never run while the state lock
/// is held.
struct Notifications<V> {
    added: Option<CacheSnapshot<V>>,
    hit: Option<CacheSnapshot<V>>,
    changed: Option<CacheSnapshot<V>>,
    timer: Option<(CacheKey, u64, Duration)>,
}

impl<V> Notifications<V> {
    fn none() -> Self {
        Self {
            added: None,
            hit: None,
            changed: None,
            timer: None,
        }
    }
}

impl<V> Clone for CacheEngine<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> CacheEngine<V> {
    // == Constructor ==
    /// Creates an engine from validated options, selecting the comparator
    /// implied by the configured key mode.
    pub fn new(options: Options<V>) -> Result<Self> {
        options.validate()?;
        let comparator = options.comparator();
        Ok(Self::with_comparator(options, comparator))
    }

    /// Creates an engine with an explicitly chosen comparator. Used by the
    /// component adapter, which needs single-element key matching.
    pub(crate) fn with_comparator(options: Options<V>, comparator: KeyComparator) -> Self {
        let stats = options
            .stats_collector
            .clone()
            .unwrap_or_else(StatsCollector::global);
        let profile_name = options
            .profile_name
            .clone()
            .unwrap_or_else(|| stats.next_profile_name());

        let state = EngineState {
            store: KeyStore::new(options.max_size),
            scheduler: ExpirationScheduler::new(),
        };

        Self {
            inner: Arc::new(EngineInner {
                state: Mutex::new(state),
                options,
                comparator,
                profile_name,
                stats,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<EngineInner<V>>) -> Self {
        Self { inner }
    }

    // == Key Derivation ==
    /// Computes the cache key for a call: the raw arguments, optionally
    /// normalized by `transform_key`, optionally collapsed to a single
    /// serialized composite value.
    pub(crate) fn derive_key(&self, args: &[Arg]) -> CacheKey {
        let mut key: CacheKey = args.to_vec();
        if let Some(transform) = &self.inner.options.transform_key {
            key = transform(key);
        }
        if self.inner.options.is_serialized {
            vec![Arg::Str(serialize_key(&key))]
        } else {
            key
        }
    }

    // == Get ==
    /// Looks up the entry addressed by `args`.
    ///
    /// On a hit the entry moves to the front, a hit is recorded, and
    /// `on_cache_hit` fires (plus a sliding-TTL re-arm when `update_expire`
    /// is set). On a miss a miss is recorded and `None` is returned; `None`
    /// is the not-found sentinel, distinct from every cached value.
    pub fn get(&self, args: &[Arg]) -> Option<CachedValue<V>> {
        let key = self.derive_key(args);
        self.get_key(&key)
    }

    pub(crate) fn get_key(&self, key: &[Arg]) -> Option<CachedValue<V>> {
        let comparator = self.inner.comparator;
        let mut notifications = Notifications::none();

        let result = {
            let mut state = self.lock_state();
            self.inner.stats.record_call(&self.inner.profile_name);

            match state.store.find_index(comparator, key) {
                Some(index) => {
                    if state.scheduler.is_past_deadline(comparator, key) {
                        // Deadline elapsed before the timer ran; never serve it
                        state.store.remove_at(index);
                        state.scheduler.cancel(comparator, key);
                        debug!("entry past its deadline, treated as a miss");
                        notifications.changed = Some(Self::snapshot_of(&state));
                        None
                    } else {
                        state.store.move_to_front(index);
                        self.inner.stats.record_hit(&self.inner.profile_name);
                        trace!("cache hit");

                        if self.inner.options.update_expire {
                            if let Some(max_age) = self.inner.options.max_age {
                                let generation =
                                    state.scheduler.arm(comparator, key.to_vec(), max_age);
                                notifications.timer = Some((key.to_vec(), generation, max_age));
                            }
                        }

                        notifications.hit = Some(Self::snapshot_of(&state));
                        Some(state.store.value_at(0).clone())
                    }
                }
                None => {
                    trace!("cache miss");
                    None
                }
            }
        };

        self.dispatch(notifications);
        result
    }

    // == Has ==
    /// Returns true when an entry is addressed by `args` and is not past
    /// its deadline. Records no stats and does not reorder the cache.
    pub fn has(&self, args: &[Arg]) -> bool {
        let key = self.derive_key(args);
        let comparator = self.inner.comparator;
        let state = self.lock_state();

        state.store.find_index(comparator, &key).is_some()
            && !state.scheduler.is_past_deadline(comparator, &key)
    }

    // == Remove ==
    /// Removes the entry addressed by `args`, cancelling its expiration in
    /// the same critical section. Returns true if an entry was removed.
    pub fn remove(&self, args: &[Arg]) -> bool {
        let key = self.derive_key(args);
        let comparator = self.inner.comparator;
        let mut notifications = Notifications::none();

        let removed = {
            let mut state = self.lock_state();
            match state.store.find_index(comparator, &key) {
                Some(index) => {
                    state.store.remove_at(index);
                    state.scheduler.cancel(comparator, &key);
                    debug!("removed entry (size={})", state.store.len());
                    notifications.changed = Some(Self::snapshot_of(&state));
                    true
                }
                None => false,
            }
        };

        self.dispatch(notifications);
        removed
    }

    // == Clear ==
    /// Removes every entry and cancels every armed expiration.
    pub fn clear(&self) {
        let mut notifications = Notifications::none();
        {
            let mut state = self.lock_state();
            state.store.clear();
            state.scheduler.cancel_all();
            debug!("cache cleared");
            notifications.changed = Some(Self::snapshot_of(&state));
        }
        self.dispatch(notifications);
    }

    // == Add ==
    /// Manually seeds an entry. A no-op when an equal key is already
    /// present: no duplicate is created and no notification fires.
    /// Returns true if the entry was added.
    pub fn add(&self, key_args: &[Arg], value: V) -> bool {
        let key = self.derive_key(key_args);
        let comparator = self.inner.comparator;
        let mut notifications = Notifications::none();

        let added = {
            let mut state = self.lock_state();
            if state.store.find_index(comparator, &key).is_some() {
                false
            } else {
                if let Some(evicted) = state
                    .store
                    .insert_front(key.clone(), CachedValue::Ready(value))
                {
                    state.scheduler.cancel(comparator, &evicted);
                }
                if let Some(max_age) = self.inner.options.max_age {
                    let generation = state.scheduler.arm(comparator, key.clone(), max_age);
                    notifications.timer = Some((key, generation, max_age));
                }
                let snapshot = Self::snapshot_of(&state);
                notifications.added = Some(snapshot.clone());
                notifications.changed = Some(snapshot);
                true
            }
        };

        self.dispatch(notifications);
        added
    }

    // == Insert Ready ==
    /// Stores a freshly computed value under `key`.
    ///
    /// If an equal key raced in while the value was being computed, the
    /// existing entry is updated in place: at most one live entry per equal
    /// key, always.
    pub(crate) fn insert_ready(&self, key: CacheKey, value: V) {
        let comparator = self.inner.comparator;
        let mut notifications = Notifications::none();

        {
            let mut state = self.lock_state();
            match state.store.find_index(comparator, &key) {
                Some(index) => {
                    state.store.replace_value_at(index, CachedValue::Ready(value));
                    state.store.move_to_front(index);
                    notifications.changed = Some(Self::snapshot_of(&state));
                }
                None => {
                    if let Some(evicted) = state
                        .store
                        .insert_front(key.clone(), CachedValue::Ready(value))
                    {
                        state.scheduler.cancel(comparator, &evicted);
                    }
                    if let Some(max_age) = self.inner.options.max_age {
                        let generation = state.scheduler.arm(comparator, key.clone(), max_age);
                        notifications.timer = Some((key, generation, max_age));
                    }
                    let snapshot = Self::snapshot_of(&state);
                    notifications.added = Some(snapshot.clone());
                    notifications.changed = Some(snapshot);
                }
            }
        }

        self.dispatch(notifications);
    }

    // == Begin Pending ==
    /// Stores the in-flight placeholder for an asynchronous computation
    /// under `key` and returns the value to await.
    ///
    /// If an equal key is already present (a concurrent call stored its
    /// placeholder first), that entry is reused as-is, so the underlying
    /// computation runs at most once per equal key.
    pub(crate) fn begin_pending(
        &self,
        key: CacheKey,
        computation: BoxFuture<'static, anyhow::Result<V>>,
    ) -> CachedValue<V> {
        let shared = reconcile::reconciled(Arc::downgrade(&self.inner), key.clone(), computation);
        let comparator = self.inner.comparator;
        let mut notifications = Notifications::none();

        let value = {
            let mut state = self.lock_state();
            match state.store.find_index(comparator, &key) {
                Some(index) => {
                    state.store.move_to_front(index);
                    state.store.value_at(0).clone()
                }
                None => {
                    let placeholder = CachedValue::Pending(shared);
                    if let Some(evicted) = state
                        .store
                        .insert_front(key.clone(), placeholder.clone())
                    {
                        state.scheduler.cancel(comparator, &evicted);
                    }
                    // Expiration is armed at resolution time, not here
                    let snapshot = Self::snapshot_of(&state);
                    notifications.added = Some(snapshot.clone());
                    notifications.changed = Some(snapshot);
                    placeholder
                }
            }
        };

        self.dispatch(notifications);
        value
    }

    // == Settle Success ==
    /// Replaces the pending placeholder for `key` with its resolved value
    /// and arms the expiration from resolution time. A no-op when the key
    /// was evicted while the computation ran.
    pub(crate) fn settle_success(&self, key: &[Arg], value: V) {
        let comparator = self.inner.comparator;
        let mut notifications = Notifications::none();

        {
            let mut state = self.lock_state();
            let Some(index) = state.store.find_index(comparator, key) else {
                trace!("resolved entry no longer cached");
                return;
            };
            state.store.replace_value_at(index, CachedValue::Ready(value));
            if let Some(max_age) = self.inner.options.max_age {
                let generation = state.scheduler.arm(comparator, key.to_vec(), max_age);
                notifications.timer = Some((key.to_vec(), generation, max_age));
            }
            notifications.changed = Some(Self::snapshot_of(&state));
        }

        self.dispatch(notifications);
    }

    // == Settle Failure ==
    /// Evicts the entry for `key` after its computation failed; a later
    /// call with an equal key must compute anew. A no-op when the key was
    /// already evicted.
    pub(crate) fn settle_failure(&self, key: &[Arg]) {
        let comparator = self.inner.comparator;
        let mut notifications = Notifications::none();

        {
            let mut state = self.lock_state();
            let Some(index) = state.store.find_index(comparator, key) else {
                return;
            };
            state.store.remove_at(index);
            state.scheduler.cancel(comparator, key);
            debug!("evicted entry for failed computation");
            notifications.changed = Some(Self::snapshot_of(&state));
        }

        self.dispatch(notifications);
    }

    // == Introspection ==
    /// Returns a copy of the cache keys, most recently used first.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.lock_state().store.keys()
    }

    /// Returns a copy of the cached values, parallel to [`CacheEngine::keys`].
    pub fn values(&self) -> Vec<CachedValue<V>> {
        self.lock_state().store.values()
    }

    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.lock_state().store.len()
    }

    /// Returns true when the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock_state().store.is_empty()
    }

    /// Returns a point-in-time copy of the whole cache.
    pub fn snapshot(&self) -> CacheSnapshot<V> {
        Self::snapshot_of(&self.lock_state())
    }

    /// Returns a copy of the armed expirations.
    pub fn expirations_snapshot(&self) -> Vec<ExpirationSnapshot> {
        self.lock_state().scheduler.snapshot()
    }

    /// Returns the configuration this engine was built with.
    pub fn options(&self) -> &Options<V> {
        &self.inner.options
    }

    /// Returns the stats bucket this engine records into.
    pub fn profile_name(&self) -> &str {
        &self.inner.profile_name
    }

    /// Returns the counters recorded for this engine's profile.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.get_stats(Some(&self.inner.profile_name))
    }

    // == Expiration Firing ==
    /// Invoked by a timer task once its delay elapses. Validates the
    /// arming generation (a cancelled or replaced timer is a silent no-op),
    /// consults `on_expire` for the renew signal, then either re-arms or
    /// evicts.
    fn handle_expiration(&self, key: &[Arg], generation: u64) {
        let comparator = self.inner.comparator;

        // Check before running the hook so the hook never runs for a
        // cancelled arming, then re-check after: the hook itself may have
        // touched the cache.
        if !self
            .lock_state()
            .scheduler
            .is_current(comparator, key, generation)
        {
            return;
        }

        let renew = self
            .inner
            .options
            .on_expire
            .as_ref()
            .map(|hook| hook(key))
            .unwrap_or(false);

        let mut notifications = Notifications::none();
        {
            let mut state = self.lock_state();
            if !state.scheduler.is_current(comparator, key, generation) {
                return;
            }

            if renew {
                if let Some(max_age) = self.inner.options.max_age {
                    let next = state.scheduler.arm(comparator, key.to_vec(), max_age);
                    notifications.timer = Some((key.to_vec(), next, max_age));
                    debug!("expiration renewed");
                }
            } else {
                state.scheduler.complete(comparator, key, generation);
                if let Some(index) = state.store.find_index(comparator, key) {
                    state.store.remove_at(index);
                    debug!("entry expired (size={})", state.store.len());
                    notifications.changed = Some(Self::snapshot_of(&state));
                }
            }
        }

        self.dispatch(notifications);
    }

    /// Spawns the sleep task backing one arming. Without a runtime the
    /// timer is skipped; deadline checks on lookup still expire the entry.
    fn spawn_timer(&self, key: CacheKey, generation: u64, delay: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            trace!("no async runtime available, expiration timer not spawned");
            return;
        };

        let weak: Weak<EngineInner<V>> = Arc::downgrade(&self.inner);
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                CacheEngine::from_inner(inner).handle_expiration(&key, generation);
            }
        });

        self.lock_state().scheduler.attach_timer(generation, task);
    }

    // == Dispatch ==
    /// Runs the work queued during a critical section: timer spawns first,
    /// then observers in mutation order.
    fn dispatch(&self, notifications: Notifications<V>) {
        if let Some((key, generation, delay)) = notifications.timer {
            self.spawn_timer(key, generation, delay);
        }
        if let Some(snapshot) = notifications.hit {
            if let Some(observer) = &self.inner.options.on_cache_hit {
                observer(&snapshot);
            }
        }
        if let Some(snapshot) = notifications.added {
            if let Some(observer) = &self.inner.options.on_cache_add {
                observer(&snapshot);
            }
        }
        if let Some(snapshot) = notifications.changed {
            if let Some(observer) = &self.inner.options.on_cache_change {
                observer(&snapshot);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState<V>> {
        self.inner.state.lock().expect("cache state lock poisoned")
    }

    fn snapshot_of(state: &EngineState<V>) -> CacheSnapshot<V> {
        CacheSnapshot {
            keys: state.store.keys(),
            values: state.store.values(),
            size: state.store.len(),
        }
    }
}
