// crates/prompt-gate-gateway/src/cache/tests.rs
// ============================================================================
// Module: TTL Cache Unit Tests
// Description: Unit tests for TTL expiry and capacity-bound eviction.
// Purpose: Validate lazy expiry and oldest-first eviction.
// Dependencies: prompt-gate-gateway
// ============================================================================

//! ## Overview
//! Exercises TTL expiry, capacity-bound oldest-first eviction, and
//! invalidation.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread::sleep;
use std::time::Duration;

use super::TtlCache;

#[test]
fn fresh_entry_is_returned_before_ttl() {
    let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60), 16);
    cache.insert("a".to_string(), 1);
    assert_eq!(cache.get(&"a".to_string()), Some(1));
}

#[test]
fn expired_entry_is_evicted_on_read() {
    let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(10), 16);
    cache.insert("a".to_string(), 1);
    sleep(Duration::from_millis(25));
    assert_eq!(cache.get(&"a".to_string()), None);
    assert!(cache.is_empty());
}

#[test]
fn insert_at_capacity_evicts_the_oldest_entry() {
    let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60), 2);
    cache.insert("oldest".to_string(), 1);
    sleep(Duration::from_millis(5));
    cache.insert("newer".to_string(), 2);
    sleep(Duration::from_millis(5));
    cache.insert("newest".to_string(), 3);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&"oldest".to_string()), None);
    assert_eq!(cache.get(&"newer".to_string()), Some(2));
    assert_eq!(cache.get(&"newest".to_string()), Some(3));
}

#[test]
fn overwriting_an_existing_key_does_not_evict() {
    let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60), 2);
    cache.insert("a".to_string(), 1);
    cache.insert("b".to_string(), 2);
    cache.insert("a".to_string(), 10);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&"a".to_string()), Some(10));
    assert_eq!(cache.get(&"b".to_string()), Some(2));
}

#[test]
fn invalidate_removes_the_entry() {
    let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60), 16);
    cache.insert("a".to_string(), 1);
    cache.invalidate(&"a".to_string());
    assert_eq!(cache.get(&"a".to_string()), None);
}
