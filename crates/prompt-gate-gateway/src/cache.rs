// crates/prompt-gate-gateway/src/cache.rs
// ============================================================================
// Module: Bounded TTL Cache
// Description: Explicit bounded map with TTL-aware get/set/evict operations.
// Purpose: Back the credential and rule-set caches with one shared type.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A [`TtlCache`] is a capacity-bounded map whose entries expire after a
//! fixed time-to-live. Expired entries are evicted lazily on read; when an
//! insert finds the cache full, the single oldest entry is evicted first.
//! All operations serialize through one internal mutex, so two concurrent
//! misses for the same key may both populate it — last writer wins, and no
//! correctness invariant depends on write order.
//!
//! The oldest-entry scan is linear; a secondary ordering structure (heap or
//! linked list by insertion time) is a possible upgrade if capacities grow
//! well beyond the defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

// ============================================================================
// SECTION: Cache Entry
// ============================================================================

/// Value plus insertion timestamp.
///
/// # Invariants
/// - An entry is valid while `now - inserted_at < ttl`.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    /// Cached value.
    value: V,
    /// Insertion time used for TTL and oldest-first eviction.
    inserted_at: Instant,
}

// ============================================================================
// SECTION: TTL Cache
// ============================================================================

/// Bounded, TTL-based cache behind a single mutex.
///
/// # Invariants
/// - Entry count never exceeds `capacity`.
/// - Expired entries are never returned from `get`.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    /// Entry map guarded by one lock; operations are O(1) except the
    /// oldest-entry eviction scan.
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    /// Time-to-live applied to every entry.
    ttl: Duration,
    /// Maximum number of live entries.
    capacity: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache with the given TTL and capacity bound.
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    /// Returns the cached value for `key` when present and unexpired.
    ///
    /// An expired entry is removed on the way out (lazy eviction).
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let Ok(mut entries) = self.entries.lock() else {
            return None;
        };
        let expired = entries
            .get(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() >= self.ttl);
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Inserts `value` under `key`, evicting the single oldest entry first
    /// when the cache is at capacity.
    pub fn insert(&self, key: K, value: V) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest_key) = oldest {
                entries.remove(&oldest_key);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Removes the entry under `key`, if any.
    pub fn invalidate(&self, key: &K) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    /// Returns the number of live entries, counting not-yet-evicted expired
    /// ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns true when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
