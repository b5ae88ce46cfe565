// crates/prompt-gate-core/src/quota.rs
// ============================================================================
// Module: Quota Guard
// Description: Advisory weekly token budget check.
// Purpose: Decide pass/reject from a cached tenant snapshot.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The quota guard compares a tenant's used and allotted token budget for
//! the current academic week. The check reads a possibly-cached snapshot and
//! reserves nothing: two concurrent requests from the same tenant may both
//! observe remaining budget and both be admitted, so transient overshoot is
//! bounded only by in-flight concurrency. That tradeoff favors throughput
//! over perfect enforcement and is part of the contract, not a bug.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::tenant::Tenant;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Raised when a tenant's weekly budget is exhausted.
///
/// `remaining` reports the true deficit and may be negative when concurrent
/// over-admission pushed usage past the budget, so operators can see the
/// overshoot magnitude instead of a clamped zero.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("weekly token quota exceeded: remaining {remaining}, resets at week {reset_week}")]
pub struct QuotaExceeded {
    /// Remaining tokens; zero or negative once the budget is spent.
    pub remaining: i64,
    /// Week at which the budget resets (the next week boundary).
    pub reset_week: u32,
}

// ============================================================================
// SECTION: Quota Guard
// ============================================================================

/// Advisory pass/reject decision over a tenant snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuotaGuard;

impl QuotaGuard {
    /// Creates a quota guard.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Checks the tenant's budget for `week` and returns the remaining
    /// token count when positive.
    ///
    /// A zero-quota tenant fails immediately at week start.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaExceeded`] when `used_quota >= week_quota`, carrying
    /// the exact (possibly negative) remainder and `reset_week = week + 1`.
    pub fn check(&self, tenant: &Tenant, week: u32) -> Result<i64, QuotaExceeded> {
        let quota = i64::try_from(tenant.week_quota).unwrap_or(i64::MAX);
        let used = i64::try_from(tenant.used_quota).unwrap_or(i64::MAX);
        let remaining = quota.saturating_sub(used);
        if remaining <= 0 {
            return Err(QuotaExceeded {
                remaining,
                reset_week: week.saturating_add(1),
            });
        }
        Ok(remaining)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
