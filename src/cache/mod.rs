//! Cache Module
//!
//! The cache contract and its backends: an in-process map, a filesystem
//! directory, and (feature-gated) Redis and Memcached servers, all behind
//! one [`Cache`] trait with identical expiry and atomicity semantics.

mod contract;
mod dummy;
mod entry;
mod file;
mod memory;

#[cfg(feature = "memcached-backend")]
mod memcached;
#[cfg(feature = "redis-backend")]
mod redis;


// Re-export public types
pub use contract::{Cache, ReplaceTtl, Ttl};
pub use dummy::DummyCache;
pub use entry::CacheEntry;
pub use file::{FileCache, DEFAULT_EXT};
pub use memory::MemoryCache;

#[cfg(feature = "memcached-backend")]
pub use memcached::MemcachedCache;
#[cfg(feature = "redis-backend")]
pub use redis::RedisCache;
