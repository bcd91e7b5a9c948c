//! Memoized Wrapper Module
//!
//! The wrapped-callable surface returned to users: a function paired with
//! its cache engine, exposing the manual cache API alongside the call path.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::cache::{
    CacheEngine, CacheSnapshot, CachedValue, ExpirationSnapshot, StatsSnapshot,
};
use crate::error::{Result, SharedFailure};
use crate::key::{Arg, CacheKey};
use crate::options::Options;

// == Memoize ==
/// Wraps a synchronous function in a memoizing cache.
///
/// Options are validated here; an invalid combination is reported before
/// any call is made.
pub fn memoize<V, F>(func: F, options: Options<V>) -> Result<Memoized<V>>
where
    V: Clone + Send + Sync + 'static,
    F: Fn(&[Arg]) -> V + Send + Sync + 'static,
{
    Ok(Memoized {
        engine: CacheEngine::new(options)?,
        func: Arc::new(func),
    })
}

// == Memoize Async ==
/// Wraps an asynchronous function in a memoizing cache.
///
/// Overlapping calls with equal keys share one in-flight computation; a
/// failed computation is evicted and its error handed to every waiter
/// unchanged.
pub fn memoize_async<V, F>(func: F, options: Options<V>) -> Result<AsyncMemoized<V>>
where
    V: Clone + Send + Sync + 'static,
    F: Fn(&[Arg]) -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync + 'static,
{
    Ok(AsyncMemoized {
        engine: CacheEngine::new(options)?,
        func: Arc::new(func),
    })
}

// == Memoized ==
/// A memoized synchronous function. Cloning shares the underlying cache.
pub struct Memoized<V> {
    engine: CacheEngine<V>,
    func: Arc<dyn Fn(&[Arg]) -> V + Send + Sync>,
}

impl<V: Clone + Send + Sync + 'static> Memoized<V> {
    // == Call ==
    /// Invokes the wrapped function through the cache: a hit returns the
    /// cached value, a miss computes once and stores the result.
    pub fn call(&self, args: &[Arg]) -> V {
        let key = self.engine.derive_key(args);
        if let Some(CachedValue::Ready(value)) = self.engine.get_key(&key) {
            return value;
        }

        let value = (self.func)(args);
        self.engine.insert_ready(key, value.clone());
        value
    }

    // == Manual Cache API ==
    /// Seeds an entry without invoking the wrapped function; a no-op when
    /// an equal key is already cached. Returns true if the entry was added.
    pub fn add(&self, key: &[Arg], value: V) -> bool {
        self.engine.add(key, value)
    }

    /// Empties the cache.
    pub fn clear(&self) {
        self.engine.clear()
    }

    /// Looks up a cached value without invoking the wrapped function.
    pub fn get(&self, key: &[Arg]) -> Option<CachedValue<V>> {
        self.engine.get(key)
    }

    /// Returns true when an equal key is cached.
    pub fn has(&self, key: &[Arg]) -> bool {
        self.engine.has(key)
    }

    /// Removes the entry for an equal key; returns true if one was removed.
    pub fn remove(&self, key: &[Arg]) -> bool {
        self.engine.remove(key)
    }

    /// Returns a copy of the cached keys, most recently used first.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.engine.keys()
    }

    /// Returns a copy of the cached values, parallel to [`Memoized::keys`].
    pub fn values(&self) -> Vec<CachedValue<V>> {
        self.engine.values()
    }

    // == Introspection ==
    /// Returns a point-in-time copy of the cache contents.
    pub fn cache_snapshot(&self) -> CacheSnapshot<V> {
        self.engine.snapshot()
    }

    /// Returns a copy of the armed expirations.
    pub fn expirations_snapshot(&self) -> Vec<ExpirationSnapshot> {
        self.engine.expirations_snapshot()
    }

    /// Returns the configuration this wrapper was built with.
    pub fn options(&self) -> &Options<V> {
        self.engine.options()
    }

    /// Returns the counters recorded for this wrapper's stats profile.
    pub fn stats(&self) -> StatsSnapshot {
        self.engine.stats()
    }

    /// Marker distinguishing memoized wrappers from plain functions.
    pub fn is_memoized(&self) -> bool {
        true
    }
}

impl<V> Clone for Memoized<V> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> fmt::Debug for Memoized<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("profile_name", &self.engine.profile_name())
            .field("size", &self.engine.len())
            .finish()
    }
}

// == Async Memoized ==
/// A memoized asynchronous function. Cloning shares the underlying cache.
pub struct AsyncMemoized<V> {
    engine: CacheEngine<V>,
    func: Arc<dyn Fn(&[Arg]) -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync>,
}

impl<V: Clone + Send + Sync + 'static> AsyncMemoized<V> {
    // == Call ==
    /// Invokes the wrapped function through the cache.
    ///
    /// A miss stores the in-flight placeholder before suspending, so a
    /// second call with an equal key awaits the same computation instead of
    /// starting another. A rejected computation is evicted and its original
    /// error returned to every waiter.
    pub async fn call(&self, args: &[Arg]) -> std::result::Result<V, SharedFailure> {
        let key = self.engine.derive_key(args);
        match self.engine.get_key(&key) {
            Some(CachedValue::Ready(value)) => Ok(value),
            Some(CachedValue::Pending(shared)) => shared.await,
            None => {
                let computation = (self.func)(args);
                match self.engine.begin_pending(key, computation) {
                    CachedValue::Ready(value) => Ok(value),
                    CachedValue::Pending(shared) => shared.await,
                }
            }
        }
    }

    // == Manual Cache API ==
    /// Seeds a settled entry without invoking the wrapped function.
    /// Returns true if the entry was added.
    pub fn add(&self, key: &[Arg], value: V) -> bool {
        self.engine.add(key, value)
    }

    /// Empties the cache.
    pub fn clear(&self) {
        self.engine.clear()
    }

    /// Looks up a cached value; a pending entry is returned as-is so the
    /// caller can await it.
    pub fn get(&self, key: &[Arg]) -> Option<CachedValue<V>> {
        self.engine.get(key)
    }

    /// Returns true when an equal key is cached (settled or in flight).
    pub fn has(&self, key: &[Arg]) -> bool {
        self.engine.has(key)
    }

    /// Removes the entry for an equal key; returns true if one was removed.
    pub fn remove(&self, key: &[Arg]) -> bool {
        self.engine.remove(key)
    }

    /// Returns a copy of the cached keys, most recently used first.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.engine.keys()
    }

    /// Returns a copy of the cached values, parallel to
    /// [`AsyncMemoized::keys`].
    pub fn values(&self) -> Vec<CachedValue<V>> {
        self.engine.values()
    }

    // == Introspection ==
    /// Returns a point-in-time copy of the cache contents.
    pub fn cache_snapshot(&self) -> CacheSnapshot<V> {
        self.engine.snapshot()
    }

    /// Returns a copy of the armed expirations.
    pub fn expirations_snapshot(&self) -> Vec<ExpirationSnapshot> {
        self.engine.expirations_snapshot()
    }

    /// Returns the configuration this wrapper was built with.
    pub fn options(&self) -> &Options<V> {
        self.engine.options()
    }

    /// Returns the counters recorded for this wrapper's stats profile.
    pub fn stats(&self) -> StatsSnapshot {
        self.engine.stats()
    }

    /// Marker distinguishing memoized wrappers from plain functions.
    pub fn is_memoized(&self) -> bool {
        true
    }
}

impl<V> Clone for AsyncMemoized<V> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> fmt::Debug for AsyncMemoized<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMemoized")
            .field("profile_name", &self.engine.profile_name())
            .field("size", &self.engine.len())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(name: &str) -> Vec<Arg> {
        vec![Arg::from(name)]
    }

    fn counting_length(calls: &Arc<AtomicUsize>) -> Memoized<usize> {
        let calls = Arc::clone(calls);
        memoize(
            move |args: &[Arg]| {
                calls.fetch_add(1, Ordering::SeqCst);
                args.len()
            },
            Options::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_call_computes_once_per_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memoized = counting_length(&calls);

        assert_eq!(memoized.call(&key("a")), 1);
        assert_eq!(memoized.call(&key("a")), 1);
        assert_eq!(memoized.call(&key("a")), 1);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_keys_compute_separately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memoized = counting_length(&calls);

        memoized.call(&key("a"));
        memoized.call(&key("b"));
        memoized.call(&[Arg::from("a"), Arg::from("b")]);

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(memoized.keys().len(), 3);
    }

    #[test]
    fn test_remove_forces_recompute() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memoized = counting_length(&calls);

        memoized.call(&key("a"));
        assert!(memoized.remove(&key("a")));
        memoized.call(&key("a"));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_seeded_value_short_circuits_computation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memoized = counting_length(&calls);

        memoized.add(&key("a"), 99);

        assert_eq!(memoized.call(&key("a")), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_options_rejected_at_wrap_time() {
        let result = memoize(
            |args: &[Arg]| args.len(),
            Options::default().with_deep_equal().with_serialized(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_clone_shares_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memoized = counting_length(&calls);
        let clone = memoized.clone();

        memoized.call(&key("a"));
        clone.call(&key("a"));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(memoized.is_memoized());
    }

    #[test]
    fn test_bounded_cache_recomputes_evicted_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let memoized = memoize(
            move |args: &[Arg]| {
                counter.fetch_add(1, Ordering::SeqCst);
                args.len()
            },
            Options::default().with_max_size(1),
        )
        .unwrap();

        memoized.call(&key("a"));
        memoized.call(&key("b"));
        memoized.call(&key("a"));

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(memoized.cache_snapshot().size, 1);
    }
}
