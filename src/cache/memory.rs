//! Memory Cache Module
//!
//! In-process backend over a guarded map; the authoritative reference
//! implementation of lazy expiry. Every contract operation, including the
//! multi-step derived ones, runs as a single critical section on one
//! `Mutex`, so concurrent callers observe one consistent total order. No
//! I/O happens while the lock is held.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::cache::contract::{counter_add, counter_value, Cache, ReplaceTtl, Ttl};
use crate::cache::entry::CacheEntry;
use crate::codec::{Codec, JsonCodec};
use crate::error::Result;
use crate::pattern::KeyPattern;

// == Memory Cache ==
/// In-memory cache backend.
pub struct MemoryCache<C: Codec = JsonCodec> {
    entries: Mutex<HashMap<String, CacheEntry>>,
    codec: C,
}

impl MemoryCache<JsonCodec> {
    /// Creates an empty cache with the default JSON codec.
    pub fn new() -> Self {
        Self::with_codec(JsonCodec)
    }
}

impl Default for MemoryCache<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> MemoryCache<C> {
    /// Creates an empty cache with an explicit codec.
    pub fn with_codec(codec: C) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            codec,
        }
    }

    /// Takes the map lock, recovering from poisoning (the map is always
    /// left structurally valid).
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a live entry, purging it first if it has expired.
    fn live_entry<'a>(
        map: &'a mut HashMap<String, CacheEntry>,
        key: &str,
    ) -> Option<&'a CacheEntry> {
        if map.get(key).is_some_and(|e| e.is_expired()) {
            map.remove(key);
        }
        map.get(key)
    }
}

impl<C: Codec> Cache for MemoryCache<C> {
    fn read(&self, key: &str) -> Result<Option<Value>> {
        let mut map = self.lock();
        match Self::live_entry(&mut map, key) {
            Some(entry) => Ok(Some(self.codec.decode(&entry.value)?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<()> {
        let encoded = self.codec.encode(value)?;
        self.lock()
            .insert(key.to_string(), CacheEntry::new(encoded, ttl));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut map = self.lock();
        // An expired entry is purged but does not count as a removal.
        match map.remove(key) {
            Some(entry) => Ok(!entry.is_expired()),
            None => Ok(false),
        }
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let mut map = self.lock();
        Ok(Self::live_entry(&mut map, key).is_some())
    }

    fn get_ttl(&self, key: &str) -> Result<Option<Ttl>> {
        let mut map = self.lock();
        Ok(Self::live_entry(&mut map, key).map(|e| Ttl::from_seconds(e.ttl_remaining())))
    }

    fn set_ttl(&self, key: &str, ttl: Option<u64>) -> Result<bool> {
        let mut map = self.lock();
        if Self::live_entry(&mut map, key).is_none() {
            return Ok(false);
        }
        if let Some(entry) = map.get_mut(key) {
            entry.set_ttl(ttl);
        }
        Ok(true)
    }

    fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let pattern = pattern.map(KeyPattern::new).transpose()?;
        let mut map = self.lock();

        // Purge first, then snapshot: the map cannot be mutated while
        // iterating it.
        let expired: Vec<String> = map
            .iter()
            .filter(|(_, e)| e.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            map.remove(&key);
        }

        Ok(map
            .keys()
            .filter(|k| pattern.as_ref().map_or(true, |p| p.matches(k)))
            .cloned()
            .collect())
    }

    fn clear(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }

    // Derived operations re-done as single critical sections: the default
    // check-then-act algorithms would release and retake the lock between
    // steps.

    fn add(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        let encoded = self.codec.encode(value)?;
        let mut map = self.lock();
        if Self::live_entry(&mut map, key).is_some() {
            return Ok(false);
        }
        map.insert(key.to_string(), CacheEntry::new(encoded, ttl));
        Ok(true)
    }

    fn replace(&self, key: &str, value: &Value, ttl: ReplaceTtl) -> Result<bool> {
        let encoded = self.codec.encode(value)?;
        let mut map = self.lock();
        if Self::live_entry(&mut map, key).is_none() {
            return Ok(false);
        }
        if let Some(entry) = map.get_mut(key) {
            entry.value = encoded;
            match ttl {
                // Keep reuses the absolute timestamp, not a re-derived TTL,
                // so repeated replaces do not drift the expiration.
                ReplaceTtl::Keep => {}
                ReplaceTtl::Never => entry.expires_at = None,
                ReplaceTtl::Seconds(s) => entry.set_ttl(Some(s)),
            }
        }
        Ok(true)
    }

    fn pop(&self, key: &str) -> Result<Option<Value>> {
        let mut map = self.lock();
        match map.remove(key) {
            Some(entry) if !entry.is_expired() => Ok(Some(self.codec.decode(&entry.value)?)),
            _ => Ok(None),
        }
    }

    fn incr(&self, key: &str, delta: i64) -> Result<i64> {
        let mut map = self.lock();
        let (current, expires_at) = match Self::live_entry(&mut map, key) {
            Some(entry) => (
                counter_value(key, &self.codec.decode(&entry.value)?)?,
                entry.expires_at,
            ),
            None => (0, None),
        };
        let next = counter_add(key, current, delta)?;
        let encoded = self.codec.encode(&Value::from(next))?;
        map.insert(
            key.to_string(),
            CacheEntry {
                value: encoded,
                expires_at,
            },
        );
        Ok(next)
    }
}
