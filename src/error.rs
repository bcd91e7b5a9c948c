//! Error types for the memoization library
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use thiserror::Error;

// == Memo Error Enum ==
/// Unified error type for the memoization library.
///
/// Configuration problems are surfaced synchronously at wrap time. Errors
/// raised by a wrapped function are never wrapped in this type; they
/// propagate to the caller unchanged (see [`SharedFailure`]).
#[derive(Error, Debug)]
pub enum MemoError {
    /// Invalid option or option combination supplied at wrap time
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

// == Shared Failure ==
/// A failure raised by a wrapped asynchronous computation.
///
/// Stored behind `Arc` so that a single in-flight computation can hand the
/// same original error value, unmodified, to every caller awaiting it.
pub type SharedFailure = Arc<anyhow::Error>;

// == Result Type Alias ==
/// Convenience Result type for the memoization library.
pub type Result<T> = std::result::Result<T, MemoError>;
