//! Cache Module
//!
//! Provides the bounded LRU entry store, the orchestrating cache engine,
//! TTL expiration scheduling, async-result reconciliation, and stats
//! collection.

mod engine;
mod entry;
mod expiration;
mod reconcile;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use engine::{CacheEngine, CacheSnapshot};
pub use entry::{CachedValue, SharedComputation};
pub use expiration::ExpirationSnapshot;
pub use stats::{StatsCollector, StatsProfile, StatsSnapshot};
pub use store::KeyStore;
