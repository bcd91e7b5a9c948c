//! Options Module
//!
//! Configuration for a memoized cache, validated once at wrap time.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheSnapshot, StatsCollector};
use crate::error::{MemoError, Result};
use crate::key::{Arg, CacheKey, KeyComparator};

// == Callback Types ==
/// Observer invoked with a cache snapshot after a mutation.
pub type CacheObserver<V> = Arc<dyn Fn(&CacheSnapshot<V>) + Send + Sync>;

/// Hook invoked with the expiring key before removal; returning true renews
/// the expiration instead of evicting.
pub type ExpireHook = Arc<dyn Fn(&[Arg]) -> bool + Send + Sync>;

/// Normalizes a derived key before it is matched or stored.
pub type KeyTransform = Arc<dyn Fn(CacheKey) -> CacheKey + Send + Sync>;

// == Options ==
/// Configuration parameters for one memoized cache.
///
/// All values have defaults; construct with [`Options::default`] and chain
/// the `with_*` methods. Invalid combinations are rejected at wrap time by
/// [`Options::validate`].
pub struct Options<V> {
    /// Maximum number of cache entries; the least-recently-used entry is
    /// evicted when a new entry would exceed it (default: unbounded)
    pub max_size: usize,
    /// Time-to-live for entries; None disables expiration
    pub max_age: Option<Duration>,
    /// Compare keys by recursive structural equality
    pub is_deep_equal: bool,
    /// Derive a single serialized composite key from the arguments
    pub is_serialized: bool,
    /// Re-arm an entry's expiration on every cache hit (sliding TTL)
    pub update_expire: bool,
    /// Stats bucket name; a name is generated when absent
    pub profile_name: Option<String>,
    /// Key normalization applied before serialization and matching
    pub transform_key: Option<KeyTransform>,
    /// Invoked after a new entry is stored
    pub on_cache_add: Option<CacheObserver<V>>,
    /// Invoked after an access is answered from cache
    pub on_cache_hit: Option<CacheObserver<V>>,
    /// Invoked after every structural mutation
    pub on_cache_change: Option<CacheObserver<V>>,
    /// Consulted when an expiration fires; true renews instead of evicting
    pub on_expire: Option<ExpireHook>,
    /// Stats collector to record into (default: the process-wide collector)
    pub stats_collector: Option<StatsCollector>,
}

impl<V> Options<V> {
    // == Validate ==
    /// Checks option combinations, returning a configuration error for
    /// contradictory settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(MemoError::Configuration(
                "max_size must be at least 1".to_string(),
            ));
        }

        if self.is_deep_equal && self.is_serialized {
            return Err(MemoError::Configuration(
                "is_deep_equal and is_serialized are mutually exclusive key modes".to_string(),
            ));
        }

        if self.update_expire && self.max_age.is_none() {
            return Err(MemoError::Configuration(
                "update_expire requires max_age".to_string(),
            ));
        }

        if self.on_expire.is_some() && self.max_age.is_none() {
            return Err(MemoError::Configuration(
                "on_expire requires max_age".to_string(),
            ));
        }

        Ok(())
    }

    // == Comparator Selection ==
    /// Returns the key comparator implied by the configured key mode.
    ///
    /// Serialized keys are single strings, so value-comparing shallow
    /// equality is correct for them.
    pub fn comparator(&self) -> KeyComparator {
        if self.is_deep_equal {
            KeyComparator::Deep
        } else {
            KeyComparator::Shallow
        }
    }

    // == Builders ==
    /// Bounds the cache to `max_size` entries.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Expires entries `max_age` after they are stored (or, for
    /// asynchronous results, after they resolve).
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Switches key matching to recursive structural equality.
    pub fn with_deep_equal(mut self) -> Self {
        self.is_deep_equal = true;
        self
    }

    /// Switches key derivation to a single serialized composite key.
    pub fn with_serialized(mut self) -> Self {
        self.is_serialized = true;
        self
    }

    /// Re-arms an entry's expiration on every cache hit.
    pub fn with_update_expire(mut self) -> Self {
        self.update_expire = true;
        self
    }

    /// Names the stats bucket accesses are recorded against.
    pub fn with_profile_name(mut self, name: impl Into<String>) -> Self {
        self.profile_name = Some(name.into());
        self
    }

    /// Installs a key normalization step.
    pub fn with_transform_key(
        mut self,
        transform: impl Fn(CacheKey) -> CacheKey + Send + Sync + 'static,
    ) -> Self {
        self.transform_key = Some(Arc::new(transform));
        self
    }

    /// Observes newly stored entries.
    pub fn with_on_cache_add(
        mut self,
        observer: impl Fn(&CacheSnapshot<V>) + Send + Sync + 'static,
    ) -> Self {
        self.on_cache_add = Some(Arc::new(observer));
        self
    }

    /// Observes cache hits.
    pub fn with_on_cache_hit(
        mut self,
        observer: impl Fn(&CacheSnapshot<V>) + Send + Sync + 'static,
    ) -> Self {
        self.on_cache_hit = Some(Arc::new(observer));
        self
    }

    /// Observes every structural mutation.
    pub fn with_on_cache_change(
        mut self,
        observer: impl Fn(&CacheSnapshot<V>) + Send + Sync + 'static,
    ) -> Self {
        self.on_cache_change = Some(Arc::new(observer));
        self
    }

    /// Consults `hook` when an expiration fires; returning true renews the
    /// timer instead of evicting the entry.
    pub fn with_on_expire(mut self, hook: impl Fn(&[Arg]) -> bool + Send + Sync + 'static) -> Self {
        self.on_expire = Some(Arc::new(hook));
        self
    }

    /// Records stats into `collector` instead of the process-wide one.
    pub fn with_stats_collector(mut self, collector: StatsCollector) -> Self {
        self.stats_collector = Some(collector);
        self
    }
}

impl<V> Default for Options<V> {
    fn default() -> Self {
        Self {
            max_size: usize::MAX,
            max_age: None,
            is_deep_equal: false,
            is_serialized: false,
            update_expire: false,
            profile_name: None,
            transform_key: None,
            on_cache_add: None,
            on_cache_hit: None,
            on_cache_change: None,
            on_expire: None,
            stats_collector: None,
        }
    }
}

impl<V> Clone for Options<V> {
    fn clone(&self) -> Self {
        Self {
            max_size: self.max_size,
            max_age: self.max_age,
            is_deep_equal: self.is_deep_equal,
            is_serialized: self.is_serialized,
            update_expire: self.update_expire,
            profile_name: self.profile_name.clone(),
            transform_key: self.transform_key.clone(),
            on_cache_add: self.on_cache_add.clone(),
            on_cache_hit: self.on_cache_hit.clone(),
            on_cache_change: self.on_cache_change.clone(),
            on_expire: self.on_expire.clone(),
            stats_collector: self.stats_collector.clone(),
        }
    }
}

impl<V> fmt::Debug for Options<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("max_size", &self.max_size)
            .field("max_age", &self.max_age)
            .field("is_deep_equal", &self.is_deep_equal)
            .field("is_serialized", &self.is_serialized)
            .field("update_expire", &self.update_expire)
            .field("profile_name", &self.profile_name)
            .field("transform_key", &self.transform_key.is_some())
            .field("on_cache_add", &self.on_cache_add.is_some())
            .field("on_cache_hit", &self.on_cache_hit.is_some())
            .field("on_cache_change", &self.on_cache_change.is_some())
            .field("on_expire", &self.on_expire.is_some())
            .finish()
    }
}
