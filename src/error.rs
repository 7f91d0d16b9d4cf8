//! Error types for the cache contract
//!
//! Provides unified error handling using thiserror.
//!
//! Absent keys are never errors anywhere in this crate: lookups return
//! `Option`, conditional writes return `bool`. Errors are reserved for
//! capability gaps, codec failures and backend I/O failures, which are
//! propagated to the caller unmodified (no retry policy lives here).

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for all cache backends.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backend cannot honor this operation at all (e.g. key iteration
    /// on Memcached). Fails loudly rather than degrading to a wrong answer.
    #[error("operation not supported by this backend: {0}")]
    NotSupported(&'static str),

    /// `incr`/`decr` touched a value that does not decode to an integer.
    #[error("value under key {0:?} is not an integer counter")]
    NotACounter(String),

    /// `incr`/`decr` would take the counter past the i64 range.
    #[error("counter under key {0:?} overflowed")]
    CounterOverflow(String),

    /// Invalid glob pattern passed to `keys`.
    #[error("invalid key pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Value failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Filesystem failure in the file backend.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored cache file was malformed (truncated header, bad key bytes).
    #[error("corrupt cache file {0:?}")]
    CorruptFile(std::path::PathBuf),

    /// Redis client failure.
    #[cfg(feature = "redis-backend")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Memcached client failure.
    #[cfg(feature = "memcached-backend")]
    #[error("memcached error: {0}")]
    Memcached(#[from] memcache::MemcacheError),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
