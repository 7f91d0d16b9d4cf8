//! Dummy Cache Module
//!
//! A backend that stores nothing: writes are accepted and dropped, every
//! key is absent. Lets callers disable caching without changing call sites.

use serde_json::Value;

use crate::cache::contract::{Cache, ReplaceTtl, Ttl};
use crate::error::Result;

// == Dummy Cache ==
/// No-op cache backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyCache;

impl DummyCache {
    /// Creates a dummy cache.
    pub fn new() -> Self {
        Self
    }
}

impl Cache for DummyCache {
    fn read(&self, _key: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    fn write(&self, _key: &str, _value: &Value, _ttl: Option<u64>) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    fn exists(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    fn get_ttl(&self, _key: &str) -> Result<Option<Ttl>> {
        Ok(None)
    }

    fn set_ttl(&self, _key: &str, _ttl: Option<u64>) -> Result<bool> {
        Ok(false)
    }

    fn keys(&self, _pattern: Option<&str>) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn replace(&self, _key: &str, _value: &Value, _ttl: ReplaceTtl) -> Result<bool> {
        Ok(false)
    }

    fn incr(&self, _key: &str, delta: i64) -> Result<i64> {
        // Nothing is stored, so every increment starts from zero.
        Ok(delta)
    }
}
