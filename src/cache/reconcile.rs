//! Async Result Reconciler Module
//!
//! Wraps a pending asynchronous computation so that its settlement is
//! reconciled with the cache: fulfillment replaces the stored placeholder
//! with the resolved value (and starts its expiration clock), rejection
//! evicts the entry and re-raises the original failure unchanged.
//!
//! The reconciler captures only a `Weak` engine reference and re-locates
//! the key by comparator equality when the computation settles; LRU
//! pressure may have evicted or moved the entry while the computation was
//! in flight, in which case settlement is a no-op beyond handing the
//! outcome to the callers.

use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::cache::engine::{CacheEngine, EngineInner};
use crate::cache::entry::SharedComputation;
use crate::error::SharedFailure;
use crate::key::CacheKey;

// == Reconciled ==
/// Builds the shared computation stored as a pending cache entry.
///
/// Every clone of the returned future observes the same settlement: the
/// resolved value on fulfillment, or the same original error value on
/// rejection (shared, never wrapped or transformed).
pub(crate) fn reconciled<V>(
    engine: Weak<EngineInner<V>>,
    key: CacheKey,
    computation: BoxFuture<'static, anyhow::Result<V>>,
) -> SharedComputation<V>
where
    V: Clone + Send + Sync + 'static,
{
    async move {
        match computation.await {
            Ok(value) => {
                if let Some(inner) = engine.upgrade() {
                    CacheEngine::from_inner(inner).settle_success(&key, value.clone());
                }
                Ok(value)
            }
            Err(error) => {
                let failure: SharedFailure = Arc::new(error);
                if let Some(inner) = engine.upgrade() {
                    CacheEngine::from_inner(inner).settle_failure(&key);
                }
                Err(failure)
            }
        }
    }
    .boxed()
    .shared()
}
