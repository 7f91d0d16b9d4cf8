//! cachecore - A uniform key-value cache contract
//!
//! One [`Cache`](cache::Cache) trait with identical semantics for
//! expiration, atomic insertion, conditional replacement, counters and
//! bulk operations, backed by interchangeable storage engines: an
//! in-process map, a filesystem directory, or (feature-gated) Redis and
//! Memcached servers.
//!
//! ```
//! use cachecore::{Cache, MemoryCache};
//! use serde_json::json;
//!
//! let cache = MemoryCache::new();
//! cache.set("greeting", &json!("hello"), Some(60)).unwrap();
//! assert_eq!(cache.get("greeting").unwrap(), Some(json!("hello")));
//! assert!(!cache.add("greeting", &json!("other"), None).unwrap());
//! ```

pub mod cache;
pub mod codec;
pub mod error;
pub mod pattern;

pub use cache::{Cache, CacheEntry, DummyCache, FileCache, MemoryCache, ReplaceTtl, Ttl};
pub use codec::{Codec, JsonCodec};
pub use error::{CacheError, Result};

#[cfg(feature = "memcached-backend")]
pub use cache::MemcachedCache;
#[cfg(feature = "redis-backend")]
pub use cache::RedisCache;
