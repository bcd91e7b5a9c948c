//! Key Module
//!
//! Provides the argument value model cache keys are built from and the
//! pluggable equality strategies used to match them.

mod arg;
mod compare;

// Re-export public types
pub use arg::{serialize_key, Arg, CacheKey, Element};
pub use compare::KeyComparator;
