//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Absent keys, an already running daemon or a disabled expiration are not
/// errors; those are reported through `bool`/`Option` return values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Capacity must be at least one entry
    #[error("Invalid capacity: {0} (capacity must be a positive value)")]
    InvalidCapacity(usize),

    /// Policy name could not be parsed
    #[error("Unknown eviction policy: {0}")]
    UnknownPolicy(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
