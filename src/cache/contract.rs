//! Cache Contract Module
//!
//! The [`Cache`] trait is the single contract every backend satisfies. It
//! splits into a small set of required primitives (`read`, `write`,
//! `remove`, ...) and a layer of derived operations (`add`, `replace`,
//! `pop`, `incr`, bulk variants) provided once as default methods.
//!
//! The default derivations are check-then-act sequences and therefore racy
//! under concurrent callers; they are the fallback of last resort. A backend
//! with a native atomic equivalent (Redis `SET NX`, `INCRBY`) overrides the
//! derived method with it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == TTL (read side) ==
/// Remaining lifetime of a live key, as reported by [`Cache::get_ttl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ttl {
    /// The key has no expiration.
    Never,
    /// Seconds until the key expires, rounded up.
    Seconds(u64),
}

impl Ttl {
    /// Converts into the `Option` form used by [`Cache::write`]:
    /// `None` = never expires.
    pub fn as_seconds(self) -> Option<u64> {
        match self {
            Ttl::Never => None,
            Ttl::Seconds(s) => Some(s),
        }
    }

    /// Builds from the `Option` form used by [`Cache::write`].
    pub fn from_seconds(ttl: Option<u64>) -> Self {
        match ttl {
            None => Ttl::Never,
            Some(s) => Ttl::Seconds(s),
        }
    }
}

// == TTL (replace side) ==
/// TTL argument for [`Cache::replace`].
///
/// A dedicated type rather than an `Option`, because "keep the existing
/// expiration" must stay distinguishable from "clear the expiration".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplaceTtl {
    /// Preserve whatever expiration the key already has.
    #[default]
    Keep,
    /// Clear the expiration; the key never expires.
    Never,
    /// Expire after this many seconds.
    Seconds(u64),
}

// == Cache Trait ==
/// The uniform cache contract.
///
/// All operations treat an expired key as absent, and reads SHOULD purge
/// the expired entry they touch (lazy expiration). Absent keys are never
/// errors; errors signal capability gaps, codec failures or backend I/O
/// failures.
pub trait Cache {
    // --- Primitives: every backend implements these ---

    /// Returns the decoded value, or `None` if the key is absent or expired.
    fn read(&self, key: &str) -> Result<Option<Value>>;

    /// Unconditionally stores the value. `ttl: None` means never expires;
    /// any existing expiration is overwritten.
    fn write(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<()>;

    /// Removes the key. Returns true iff a live (non-expired) key was removed.
    fn remove(&self, key: &str) -> Result<bool>;

    /// Returns true iff the key is present and not expired.
    fn exists(&self, key: &str) -> Result<bool>;

    /// Returns the remaining lifetime of the key, or `None` if the key is
    /// absent or expired.
    fn get_ttl(&self, key: &str) -> Result<Option<Ttl>>;

    /// Updates the expiration on an existing key (`None` clears it).
    /// Returns true iff the key existed.
    fn set_ttl(&self, key: &str, ttl: Option<u64>) -> Result<bool>;

    /// Returns the live keys, optionally filtered by a glob pattern
    /// (`*`, `?`, `[...]`).
    ///
    /// Backends whose store offers no enumeration primitive return
    /// [`CacheError::NotSupported`] rather than a silently empty result.
    fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>>;

    /// Removes every key in this cache's namespace.
    fn clear(&self) -> Result<()>;

    // --- Derived operations: default algorithms over the primitives ---

    /// Returns the stored value, or `None` if absent/expired.
    fn get(&self, key: &str) -> Result<Option<Value>> {
        self.read(key)
    }

    /// Unconditionally stores the value with an optional TTL.
    fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<()> {
        self.write(key, value, ttl)
    }

    /// Stores the value only if the key is absent or expired.
    /// Returns whether it stored.
    fn add(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        if self.exists(key)? {
            return Ok(false);
        }
        self.write(key, value, ttl)?;
        Ok(true)
    }

    /// Stores the value only if the key currently exists (and is not
    /// expired). Returns whether it stored.
    ///
    /// `ReplaceTtl::Keep` (the default argument by convention) preserves the
    /// key's existing expiration; `Never` clears it; `Seconds` resets it.
    fn replace(&self, key: &str, value: &Value, ttl: ReplaceTtl) -> Result<bool> {
        let current = match self.get_ttl(key)? {
            None => return Ok(false),
            Some(ttl) => ttl,
        };
        let new_ttl = match ttl {
            ReplaceTtl::Keep => current.as_seconds(),
            ReplaceTtl::Never => None,
            ReplaceTtl::Seconds(s) => Some(s),
        };
        self.write(key, value, new_ttl)?;
        Ok(true)
    }

    /// Removes the key. Returns whether a live key was removed.
    fn delete(&self, key: &str) -> Result<bool> {
        self.remove(key)
    }

    /// Reads then deletes the key, returning the prior value.
    fn pop(&self, key: &str) -> Result<Option<Value>> {
        let value = self.read(key)?;
        if value.is_some() {
            self.remove(key)?;
        }
        Ok(value)
    }

    /// Alias of [`Cache::exists`].
    fn has_key(&self, key: &str) -> Result<bool> {
        self.exists(key)
    }

    /// Returns one value per input key, in input order; absent keys yield
    /// `None`. No cross-key atomicity is implied.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Value>>> {
        keys.iter().map(|k| self.read(k)).collect()
    }

    /// Stores every pair with the same TTL. No cross-key atomicity is
    /// implied; a failure may leave a prefix of the pairs applied.
    fn set_many(&self, pairs: &[(&str, Value)], ttl: Option<u64>) -> Result<()> {
        for (key, value) in pairs {
            self.write(key, value, ttl)?;
        }
        Ok(())
    }

    /// Removes every key, returning one flag per input key in input order.
    fn delete_many(&self, keys: &[&str]) -> Result<Vec<bool>> {
        keys.iter().map(|k| self.remove(k)).collect()
    }

    /// Treats the stored value as an integer counter: creates the key with
    /// base value 0 and no expiration if absent, then applies `delta`.
    /// Returns the resulting value. An existing TTL survives the increment.
    /// Taking the counter past the i64 range is [`CacheError::CounterOverflow`].
    fn incr(&self, key: &str, delta: i64) -> Result<i64> {
        let current = match self.read(key)? {
            Some(value) => counter_value(key, &value)?,
            None => 0,
        };
        let next = counter_add(key, current, delta)?;
        let next_value = Value::from(next);
        // add-else-replace: a fresh key gets no expiration, an existing key
        // keeps the one it had.
        if !self.add(key, &next_value, None)? {
            self.replace(key, &next_value, ReplaceTtl::Keep)?;
        }
        Ok(next)
    }

    /// Counterpart of [`Cache::incr`]: `decr(k, n) == incr(k, -n)`.
    fn decr(&self, key: &str, delta: i64) -> Result<i64> {
        self.incr(key, counter_neg(key, delta)?)
    }

    /// Number of live keys. Only supported where [`Cache::keys`] is.
    fn len(&self) -> Result<usize> {
        Ok(self.keys(None)?.len())
    }

    /// Returns true if the cache holds no live keys.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

// == Counter Helpers ==
/// Extracts the integer out of a counter payload.
pub(crate) fn counter_value(key: &str, value: &Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| CacheError::NotACounter(key.to_string()))
}

/// Applies a delta, refusing to wrap around the i64 range (Redis refuses
/// the same way on `INCRBY`).
pub(crate) fn counter_add(key: &str, current: i64, delta: i64) -> Result<i64> {
    current
        .checked_add(delta)
        .ok_or_else(|| CacheError::CounterOverflow(key.to_string()))
}

/// Negates a delta; `i64::MIN` has no positive counterpart.
pub(crate) fn counter_neg(key: &str, delta: i64) -> Result<i64> {
    delta
        .checked_neg()
        .ok_or_else(|| CacheError::CounterOverflow(key.to_string()))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ttl_round_trips_option_form() {
        assert_eq!(Ttl::from_seconds(None), Ttl::Never);
        assert_eq!(Ttl::from_seconds(Some(7)), Ttl::Seconds(7));
        assert_eq!(Ttl::Never.as_seconds(), None);
        assert_eq!(Ttl::Seconds(7).as_seconds(), Some(7));
    }

    #[test]
    fn test_replace_ttl_defaults_to_keep() {
        assert_eq!(ReplaceTtl::default(), ReplaceTtl::Keep);
    }

    #[test]
    fn test_counter_add_refuses_to_wrap() {
        assert_eq!(counter_add("k", 40, 2).unwrap(), 42);
        assert!(matches!(
            counter_add("k", i64::MAX, 1),
            Err(CacheError::CounterOverflow(_))
        ));
        assert!(matches!(
            counter_add("k", i64::MIN, -1),
            Err(CacheError::CounterOverflow(_))
        ));
        assert!(matches!(
            counter_neg("k", i64::MIN),
            Err(CacheError::CounterOverflow(_))
        ));
    }

    #[test]
    fn test_counter_value_rejects_non_integers() {
        assert_eq!(counter_value("k", &json!(3)).unwrap(), 3);
        assert!(matches!(
            counter_value("k", &json!("three")),
            Err(CacheError::NotACounter(_))
        ));
        assert!(matches!(
            counter_value("k", &json!(1.5)),
            Err(CacheError::NotACounter(_))
        ));
    }
}
