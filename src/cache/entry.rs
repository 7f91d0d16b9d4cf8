//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.
//! An entry couples an encoded payload with an optional absolute expiration
//! timestamp; an expired entry is logically absent on every read path.

use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// Represents a single stored cache entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The encoded payload bytes
    pub value: Vec<u8>,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The encoded payload to store
    /// * `ttl_seconds` - Optional TTL in seconds; `None` means never expires
    pub fn new(value: Vec<u8>, ttl_seconds: Option<u64>) -> Self {
        Self {
            value,
            expires_at: ttl_to_expires_at(ttl_seconds),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to the expiration time, so
    /// `is_expired() == (ttl_remaining() == Some(0))` always holds.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in whole seconds, rounded up.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired
    /// - `Some(remaining)` if the entry has a TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.expires_at.map(|expires| {
            let now = current_timestamp_ms();
            if expires > now {
                (expires - now).div_ceil(1000)
            } else {
                0
            }
        })
    }

    // == Set TTL ==
    /// Replaces the entry's expiration with a fresh TTL from now.
    pub fn set_ttl(&mut self, ttl_seconds: Option<u64>) {
        self.expires_at = ttl_to_expires_at(ttl_seconds);
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}

/// Converts a relative TTL in seconds into an absolute millisecond timestamp.
pub fn ttl_to_expires_at(ttl_seconds: Option<u64>) -> Option<u64> {
    ttl_seconds.map(|ttl| current_timestamp_ms() + ttl * 1000)
}
