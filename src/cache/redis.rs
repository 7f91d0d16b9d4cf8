//! Redis Cache Module
//!
//! Backend over a Redis server. TTL bookkeeping and single-key atomicity
//! are delegated to the store's native commands wherever one exists:
//! `add` is `SET NX`, `replace` is `SET XX` (with `KEEPTTL`), counters are
//! `INCRBY`, batches are one pipelined round trip, and key iteration is a
//! cursor `SCAN`. Lazy expiration is the server's own.
//!
//! Fidelity notes: `incr` inherits the server's integer representation, so
//! a key holding a non-integer payload fails with the server's own error
//! rather than [`CacheError::NotACounter`]; `clear` is `FLUSHDB`, which
//! wipes the whole logical database, not a namespace.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use redis::{Commands, Connection, ExistenceCheck, SetExpiry, SetOptions};
use serde_json::Value;
use tracing::debug;

use crate::cache::contract::{Cache, ReplaceTtl, Ttl};
use crate::codec::{Codec, JsonCodec};
use crate::error::Result;

// == Redis Cache ==
/// Redis cache backend over one synchronous connection.
pub struct RedisCache<C: Codec = JsonCodec> {
    conn: Mutex<Connection>,
    codec: C,
}

impl RedisCache<JsonCodec> {
    /// Connects to the given `redis://` URL with the default JSON codec.
    pub fn from_url(url: &str) -> Result<Self> {
        Self::from_url_with_codec(url, JsonCodec)
    }

    /// Wraps a connection from an existing client.
    pub fn new(client: &redis::Client) -> Result<Self> {
        Self::with_codec(client, JsonCodec)
    }
}

impl<C: Codec> RedisCache<C> {
    /// Connects to the given `redis://` URL with an explicit codec.
    pub fn from_url_with_codec(url: &str, codec: C) -> Result<Self> {
        let client = redis::Client::open(url)?;
        Self::with_codec(&client, codec)
    }

    /// Wraps a connection from an existing client, with an explicit codec.
    pub fn with_codec(client: &redis::Client, codec: C) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(client.get_connection()?),
            codec,
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Codec> Cache for RedisCache<C> {
    fn read(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<Vec<u8>> = self.conn().get(key)?;
        match raw {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<()> {
        let payload = self.codec.encode(value)?;
        let mut conn = self.conn();
        match ttl {
            Some(secs) => conn.set_ex::<_, _, ()>(key, payload, secs)?,
            None => conn.set::<_, _, ()>(key, payload)?,
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let removed: i64 = self.conn().del(key)?;
        Ok(removed > 0)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.conn().exists(key)?)
    }

    fn get_ttl(&self, key: &str) -> Result<Option<Ttl>> {
        // TTL: -2 = key absent, -1 = no expiration, n = seconds remaining.
        let ttl: i64 = self.conn().ttl(key)?;
        Ok(match ttl {
            -2 => None,
            -1 => Some(Ttl::Never),
            secs => Some(Ttl::Seconds(secs as u64)),
        })
    }

    fn set_ttl(&self, key: &str, ttl: Option<u64>) -> Result<bool> {
        let mut conn = self.conn();
        match ttl {
            Some(secs) => Ok(conn.expire(key, secs as i64)?),
            None => {
                // PERSIST alone returns false both for "key absent" and
                // "key already has no expiration", so pair it with EXISTS.
                let (_persisted, exists): (i64, bool) =
                    redis::pipe().persist(key).exists(key).query(&mut *conn)?;
                Ok(exists)
            }
        }
    }

    fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let pattern = pattern.unwrap_or("*");
        let mut conn = self.conn();
        // SCAN may revisit a key under concurrent mutation; de-duplicate.
        let mut seen: HashSet<String> = HashSet::new();
        for key in conn.scan_match::<_, String>(pattern)? {
            seen.insert(key);
        }
        Ok(seen.into_iter().collect())
    }

    fn clear(&self) -> Result<()> {
        debug!("flushing redis database");
        redis::cmd("FLUSHDB").query::<()>(&mut *self.conn())?;
        Ok(())
    }

    fn add(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        let payload = self.codec.encode(value)?;
        let mut opts = SetOptions::default().conditional_set(ExistenceCheck::NX);
        if let Some(secs) = ttl {
            opts = opts.with_expiration(SetExpiry::EX(secs));
        }
        // SET NX answers OK or nil; nil means the key already existed.
        let stored: Option<String> = self.conn().set_options(key, payload, opts)?;
        Ok(stored.is_some())
    }

    fn replace(&self, key: &str, value: &Value, ttl: ReplaceTtl) -> Result<bool> {
        let payload = self.codec.encode(value)?;
        let mut opts = SetOptions::default().conditional_set(ExistenceCheck::XX);
        match ttl {
            ReplaceTtl::Keep => opts = opts.with_expiration(SetExpiry::KEEPTTL),
            // A plain SET clears any expiration.
            ReplaceTtl::Never => {}
            ReplaceTtl::Seconds(secs) => opts = opts.with_expiration(SetExpiry::EX(secs)),
        }
        let stored: Option<String> = self.conn().set_options(key, payload, opts)?;
        Ok(stored.is_some())
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Value>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<Option<Vec<u8>>> = self.conn().mget(keys)?;
        raw.into_iter()
            .map(|slot| match slot {
                Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
                None => Ok(None),
            })
            .collect()
    }

    fn set_many(&self, pairs: &[(&str, Value)], ttl: Option<u64>) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        // One pipelined round trip; not atomic across keys, a connection
        // drop mid-pipeline may leave a prefix applied.
        let mut pipe = redis::pipe();
        for (key, value) in pairs {
            let payload = self.codec.encode(value)?;
            match ttl {
                Some(secs) => pipe.set_ex(key, payload, secs).ignore(),
                None => pipe.set(key, payload).ignore(),
            };
        }
        pipe.query::<()>(&mut *self.conn())?;
        Ok(())
    }

    fn delete_many(&self, keys: &[&str]) -> Result<Vec<bool>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.del(key);
        }
        let removed: Vec<i64> = pipe.query(&mut *self.conn())?;
        Ok(removed.into_iter().map(|n| n > 0).collect())
    }

    fn incr(&self, key: &str, delta: i64) -> Result<i64> {
        // Native INCRBY: atomic, creates the key at 0, preserves any TTL.
        Ok(self.conn().incr(key, delta)?)
    }

    fn decr(&self, key: &str, delta: i64) -> Result<i64> {
        Ok(self.conn().decr(key, delta)?)
    }
}
