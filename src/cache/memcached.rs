//! Memcached Cache Module
//!
//! Backend over a Memcached server. Conditional stores map to the native
//! `add`/`replace` commands and counters to native `incr`/`decr`, but this
//! store cannot express the whole contract; the gaps fail loudly:
//!
//! - no keep-TTL primitive: `replace(.., ReplaceTtl::Keep)` is
//!   [`CacheError::NotSupported`]
//! - no TTL inspection: `get_ttl` is `NotSupported` (updating via `touch`
//!   works, so `set_ttl` is supported)
//! - no enumeration: `keys` and `len` are `NotSupported`
//!
//! Native counters reject negative deltas, so negative `incr` routes
//! through `decr` and vice versa, and increments pre-seed the key with 0
//! because native incr on an absent key fails. Native decr floors the
//! counter at zero, so every `decr` is a read-modify-write instead, which
//! resets any TTL (the TTL cannot be read back); a documented gap.

use memcache::{Client, CommandError, MemcacheError};
use serde_json::Value;
use tracing::debug;

use crate::cache::contract::{counter_neg, counter_value, Cache, ReplaceTtl, Ttl};
use crate::codec::{Codec, JsonCodec};
use crate::error::{CacheError, Result};

// == Memcached Cache ==
/// Memcached cache backend.
pub struct MemcachedCache<C: Codec = JsonCodec> {
    client: Client,
    codec: C,
}

impl MemcachedCache<JsonCodec> {
    /// Connects to the given `memcache://` URL with the default JSON codec.
    pub fn connect(url: &str) -> Result<Self> {
        Ok(Self::new(Client::connect(url)?))
    }

    /// Wraps an existing client.
    pub fn new(client: Client) -> Self {
        Self::with_codec(client, JsonCodec)
    }
}

impl<C: Codec> MemcachedCache<C> {
    /// Wraps an existing client with an explicit codec.
    pub fn with_codec(client: Client, codec: C) -> Self {
        Self { client, codec }
    }

    /// TTL in memcached's wire form: 0 means never expires.
    fn expiration(ttl: Option<u64>) -> u32 {
        ttl.unwrap_or(0) as u32
    }
}

impl<C: Codec> Cache for MemcachedCache<C> {
    fn read(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<Vec<u8>> = self.client.get(key)?;
        match raw {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<()> {
        let payload = self.codec.encode(value)?;
        self.client
            .set(key, payload.as_slice(), Self::expiration(ttl))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.client.delete(key)?)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        // No native EXISTS; fetch without decoding.
        let raw: Option<Vec<u8>> = self.client.get(key)?;
        Ok(raw.is_some())
    }

    fn get_ttl(&self, _key: &str) -> Result<Option<Ttl>> {
        Err(CacheError::NotSupported("get_ttl on memcached"))
    }

    fn set_ttl(&self, key: &str, ttl: Option<u64>) -> Result<bool> {
        Ok(self.client.touch(key, Self::expiration(ttl))?)
    }

    fn keys(&self, _pattern: Option<&str>) -> Result<Vec<String>> {
        Err(CacheError::NotSupported("key iteration on memcached"))
    }

    fn clear(&self) -> Result<()> {
        debug!("flushing memcached store");
        self.client.flush()?;
        Ok(())
    }

    fn add(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        let payload = self.codec.encode(value)?;
        match self
            .client
            .add(key, payload.as_slice(), Self::expiration(ttl))
        {
            Ok(()) => Ok(true),
            Err(MemcacheError::CommandError(CommandError::KeyExists)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn replace(&self, key: &str, value: &Value, ttl: ReplaceTtl) -> Result<bool> {
        let expiration = match ttl {
            ReplaceTtl::Keep => {
                return Err(CacheError::NotSupported(
                    "replace with kept TTL on memcached",
                ))
            }
            ReplaceTtl::Never => 0,
            ReplaceTtl::Seconds(secs) => secs as u32,
        };
        let payload = self.codec.encode(value)?;
        match self.client.replace(key, payload.as_slice(), expiration) {
            Ok(()) => Ok(true),
            Err(MemcacheError::CommandError(CommandError::KeyNotFound)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Value>>> {
        // One batched fetch; results rearranged into input order.
        let mut found = self.client.gets::<Vec<u8>>(keys)?;
        keys.iter()
            .map(|key| match found.remove(*key) {
                Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
                None => Ok(None),
            })
            .collect()
    }

    fn incr(&self, key: &str, delta: i64) -> Result<i64> {
        if delta < 0 {
            return self.decr(key, counter_neg(key, delta)?);
        }
        // Native incr fails on an absent key; seed it with 0 first.
        self.add(key, &Value::from(0), None)?;
        Ok(self.client.increment(key, delta as u64)? as i64)
    }

    fn decr(&self, key: &str, delta: i64) -> Result<i64> {
        if delta < 0 {
            return self.incr(key, counter_neg(key, delta)?);
        }
        // Native decr floors at zero, so every decrement goes through a
        // read-modify-write. This resets any TTL: the old one cannot be
        // read back.
        let current = match self.read(key)? {
            Some(value) => counter_value(key, &value)?,
            None => 0,
        };
        let next = current
            .checked_sub(delta)
            .ok_or_else(|| CacheError::CounterOverflow(key.to_string()))?;
        self.write(key, &Value::from(next), None)?;
        Ok(next)
    }
}
