// crates/prompt-gate-gateway/src/config/tests.rs
// ============================================================================
// Module: Gateway Configuration Unit Tests
// Description: Unit tests for environment loading and validation.
// Purpose: Validate fail-fast admin token handling and override parsing.
// Dependencies: prompt-gate-gateway
// ============================================================================

//! ## Overview
//! Exercises required-variable enforcement, defaulting, override parsing,
//! and invalid-value rejection. Tests serialize through one lock because
//! the environment is process-global.

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
#![allow(
    unsafe_code,
    reason = "Environment mutation requires unsafe blocks; access is serialized by ENV_LOCK."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use super::ConfigError;
use super::GatewayConfig;

/// Serializes environment mutation across tests.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Variables touched by any test, cleared before each run.
const TOUCHED: [&str; 5] = [
    "ADMIN_TOKEN",
    "GATEWAY_BIND_ADDR",
    "GATEWAY_STREAMING_LIMIT",
    "GATEWAY_NORMAL_LIMIT",
    "GATEWAY_CURRENT_WEEK",
];

/// Acquires the environment lock and clears touched variables.
fn clean_env() -> MutexGuard<'static, ()> {
    let guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    for name in TOUCHED {
        // SAFETY: access is serialized by ENV_LOCK.
        unsafe { env::remove_var(name) };
    }
    guard
}

/// Sets one variable under the held lock.
fn set(name: &str, value: &str) {
    // SAFETY: callers hold ENV_LOCK.
    unsafe { env::set_var(name, value) };
}

#[test]
fn missing_admin_token_fails_fast() {
    let _guard = clean_env();
    assert_eq!(GatewayConfig::from_env(), Err(ConfigError::Missing("ADMIN_TOKEN")));
}

#[test]
fn blank_admin_token_is_treated_as_missing() {
    let _guard = clean_env();
    set("ADMIN_TOKEN", "   ");
    assert_eq!(GatewayConfig::from_env(), Err(ConfigError::Missing("ADMIN_TOKEN")));
}

#[test]
fn admin_token_is_trimmed_and_defaults_apply() {
    let _guard = clean_env();
    set("ADMIN_TOKEN", "  secret \n");
    let config = GatewayConfig::from_env().unwrap();
    assert_eq!(config.admin_token, "secret");
    assert_eq!(config.bind_addr, "0.0.0.0:8080");
    assert_eq!(config.streaming_limit, 50);
    assert_eq!(config.normal_limit, 200);
    assert_eq!(config.acquire_timeout, Duration::from_secs(5));
    assert_eq!(config.key_cache_ttl, Duration::from_secs(60));
    assert_eq!(config.rule_cache_ttl, Duration::from_secs(300));
    assert_eq!(config.match_timeout, Duration::from_secs(2));
    assert_eq!(config.current_week, 1);
}

#[test]
fn overrides_parse_into_typed_fields() {
    let _guard = clean_env();
    set("ADMIN_TOKEN", "secret");
    set("GATEWAY_BIND_ADDR", "127.0.0.1:9000");
    set("GATEWAY_STREAMING_LIMIT", "8");
    set("GATEWAY_NORMAL_LIMIT", "16");
    set("GATEWAY_CURRENT_WEEK", "7");
    let config = GatewayConfig::from_env().unwrap();
    assert_eq!(config.bind_addr, "127.0.0.1:9000");
    assert_eq!(config.streaming_limit, 8);
    assert_eq!(config.normal_limit, 16);
    assert_eq!(config.current_week, 7);
}

#[test]
fn unparsable_override_names_the_variable() {
    let _guard = clean_env();
    set("ADMIN_TOKEN", "secret");
    set("GATEWAY_STREAMING_LIMIT", "many");
    let err = GatewayConfig::from_env().unwrap_err();
    assert_eq!(
        err,
        ConfigError::Invalid {
            name: "GATEWAY_STREAMING_LIMIT",
            value: "many".to_string(),
        }
    );
}
