// crates/prompt-gate-gateway/src/config.rs
// ============================================================================
// Module: Gateway Configuration
// Description: Environment-backed configuration with fail-fast validation.
// Purpose: Collect every tunable in one place with explicit defaults.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Configuration loads from environment variables at startup. The admin
//! token is the only required value and its absence aborts startup with a
//! descriptive error; every other knob has a production default. Parsed
//! values land in typed fields so the rest of the gateway never touches the
//! environment.
//!
//! ## Invariants
//! - `from_env` either returns a fully valid configuration or an error
//!   naming the offending variable.
//! - The admin token is trimmed and non-empty.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::admission::DEFAULT_ACQUIRE_TIMEOUT;
use crate::admission::DEFAULT_NORMAL_LIMIT;
use crate::admission::DEFAULT_STREAMING_LIMIT;
use crate::auth::DEFAULT_KEY_CACHE_CAPACITY;
use crate::auth::DEFAULT_KEY_CACHE_TTL;
use crate::engine::DEFAULT_MATCH_TIMEOUT;
use crate::engine::DEFAULT_RULE_CACHE_TTL;

// ============================================================================
// SECTION: Environment Variables
// ============================================================================

/// Required admin token variable.
const ENV_ADMIN_TOKEN: &str = "ADMIN_TOKEN";
/// Listen address variable.
const ENV_BIND_ADDR: &str = "GATEWAY_BIND_ADDR";
/// Upstream base URL variable.
const ENV_UPSTREAM_BASE_URL: &str = "GATEWAY_UPSTREAM_BASE_URL";
/// Streaming pool size variable.
const ENV_STREAMING_LIMIT: &str = "GATEWAY_STREAMING_LIMIT";
/// Normal pool size variable.
const ENV_NORMAL_LIMIT: &str = "GATEWAY_NORMAL_LIMIT";
/// Admission bounded-wait variable, in milliseconds.
const ENV_ACQUIRE_TIMEOUT_MS: &str = "GATEWAY_ACQUIRE_TIMEOUT_MS";
/// Credential cache TTL variable, in seconds.
const ENV_KEY_CACHE_TTL_SECS: &str = "GATEWAY_KEY_CACHE_TTL_SECS";
/// Credential cache capacity variable.
const ENV_KEY_CACHE_CAPACITY: &str = "GATEWAY_KEY_CACHE_CAPACITY";
/// Rule cache TTL variable, in seconds.
const ENV_RULE_CACHE_TTL_SECS: &str = "GATEWAY_RULE_CACHE_TTL_SECS";
/// Pattern match deadline variable, in milliseconds.
const ENV_MATCH_TIMEOUT_MS: &str = "GATEWAY_MATCH_TIMEOUT_MS";
/// Current academic week variable.
const ENV_CURRENT_WEEK: &str = "GATEWAY_CURRENT_WEEK";
/// Upstream request timeout variable, in seconds.
const ENV_UPSTREAM_TIMEOUT_SECS: &str = "GATEWAY_UPSTREAM_TIMEOUT_SECS";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading failures.
///
/// # Invariants
/// - Messages name the offending variable; values are never echoed for the
///   admin token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable is absent or blank.
    #[error("required environment variable {0} is missing or empty")]
    Missing(&'static str),
    /// A variable is present but does not parse.
    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Offending value as found in the environment.
        value: String,
    },
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Fully resolved gateway configuration.
///
/// # Invariants
/// - All durations and limits are positive once construction succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Privileged admin token, trimmed.
    pub admin_token: String,
    /// Listen address for the HTTP server.
    pub bind_addr: String,
    /// Upstream provider base URL.
    pub upstream_base_url: String,
    /// Streaming admission pool size.
    pub streaming_limit: usize,
    /// Normal admission pool size.
    pub normal_limit: usize,
    /// Bounded wait before an admission attempt is rejected.
    pub acquire_timeout: Duration,
    /// Credential cache TTL.
    pub key_cache_ttl: Duration,
    /// Credential cache capacity bound.
    pub key_cache_capacity: usize,
    /// Compiled rule cache TTL.
    pub rule_cache_ttl: Duration,
    /// Deadline for a single pattern match.
    pub match_timeout: Duration,
    /// Current academic week used for rule scoping and quota resets.
    pub current_week: u32,
    /// Upstream request timeout.
    pub upstream_timeout: Duration,
}

impl GatewayConfig {
    /// Loads configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when the admin token is absent or
    /// blank, and [`ConfigError::Invalid`] when any override fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let admin_token = env::var(ENV_ADMIN_TOKEN)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::Missing(ENV_ADMIN_TOKEN))?;
        Ok(Self {
            admin_token,
            bind_addr: env::var(ENV_BIND_ADDR).unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            upstream_base_url: env::var(ENV_UPSTREAM_BASE_URL)
                .unwrap_or_else(|_| "https://openrouter.ai/api".to_string()),
            streaming_limit: parsed_var(ENV_STREAMING_LIMIT, DEFAULT_STREAMING_LIMIT)?,
            normal_limit: parsed_var(ENV_NORMAL_LIMIT, DEFAULT_NORMAL_LIMIT)?,
            acquire_timeout: Duration::from_millis(parsed_var(
                ENV_ACQUIRE_TIMEOUT_MS,
                u64::try_from(DEFAULT_ACQUIRE_TIMEOUT.as_millis()).unwrap_or(5_000),
            )?),
            key_cache_ttl: Duration::from_secs(parsed_var(
                ENV_KEY_CACHE_TTL_SECS,
                DEFAULT_KEY_CACHE_TTL.as_secs(),
            )?),
            key_cache_capacity: parsed_var(ENV_KEY_CACHE_CAPACITY, DEFAULT_KEY_CACHE_CAPACITY)?,
            rule_cache_ttl: Duration::from_secs(parsed_var(
                ENV_RULE_CACHE_TTL_SECS,
                DEFAULT_RULE_CACHE_TTL.as_secs(),
            )?),
            match_timeout: Duration::from_millis(parsed_var(
                ENV_MATCH_TIMEOUT_MS,
                u64::try_from(DEFAULT_MATCH_TIMEOUT.as_millis()).unwrap_or(2_000),
            )?),
            current_week: parsed_var(ENV_CURRENT_WEEK, 1)?,
            upstream_timeout: Duration::from_secs(parsed_var(ENV_UPSTREAM_TIMEOUT_SECS, 60)?),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses an optional override variable, falling back to `default` when the
/// variable is unset.
fn parsed_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value,
        }),
        Err(_) => Ok(default),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
