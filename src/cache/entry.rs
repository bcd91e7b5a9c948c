//! Cached Value Module
//!
//! Defines the value half of a cache entry: either a settled result or the
//! in-flight placeholder for a pending asynchronous computation.

use std::fmt;

use futures::future::{BoxFuture, Shared};

use crate::error::SharedFailure;

// == Shared Computation ==
/// A de-duplicated in-flight asynchronous computation.
///
/// Overlapping calls with equal keys all await one clone of the same shared
/// future, so the underlying computation runs at most once.
pub type SharedComputation<V> = Shared<BoxFuture<'static, std::result::Result<V, SharedFailure>>>;

// == Cached Value ==
/// The stored value of one cache entry.
///
/// A `Pending` value is the placeholder recorded synchronously when an
/// asynchronous computation begins; the reconciler later replaces it in
/// place with `Ready` on fulfillment, or evicts the entry on rejection.
#[derive(Clone)]
pub enum CachedValue<V> {
    /// A settled result
    Ready(V),
    /// An in-flight asynchronous computation
    Pending(SharedComputation<V>),
}

impl<V> CachedValue<V> {
    // == Is Pending ==
    /// Returns true if this value is an unsettled asynchronous computation.
    pub fn is_pending(&self) -> bool {
        matches!(self, CachedValue::Pending(_))
    }

    // == Ready Accessor ==
    /// Returns the settled value, or None while the computation is pending.
    pub fn ready(&self) -> Option<&V> {
        match self {
            CachedValue::Ready(value) => Some(value),
            CachedValue::Pending(_) => None,
        }
    }

    /// Consumes the cached value, returning the settled value if any.
    pub fn into_ready(self) -> Option<V> {
        match self {
            CachedValue::Ready(value) => Some(value),
            CachedValue::Pending(_) => None,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for CachedValue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachedValue::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            CachedValue::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}
