//! memofn - In-memory function memoization
//!
//! Wraps functions in a bounded LRU cache keyed by call arguments, with
//! pluggable key equality (shallow, deep, serialized, element identity),
//! per-entry TTL expiration, reconciliation of asynchronous results, and
//! opt-in call/hit statistics.
//!
//! # Example
//!
//! ```
//! use memofn::{memoize, Arg, Options};
//!
//! let lengths = memoize(
//!     |args: &[Arg]| args.len(),
//!     Options::default().with_max_size(100),
//! )
//! .unwrap();
//!
//! assert_eq!(lengths.call(&[Arg::from("a"), Arg::from("b")]), 2);
//! ```

pub mod cache;
pub mod component;
pub mod error;
pub mod key;
pub mod memoized;
pub mod options;

pub use cache::{
    CacheEngine, CacheSnapshot, CachedValue, ExpirationSnapshot, StatsCollector, StatsProfile,
    StatsSnapshot,
};
pub use component::{memoize_component, MemoizedComponent};
pub use error::{MemoError, Result, SharedFailure};
pub use key::{Arg, CacheKey, Element, KeyComparator};
pub use memoized::{memoize, memoize_async, AsyncMemoized, Memoized};
pub use options::Options;
