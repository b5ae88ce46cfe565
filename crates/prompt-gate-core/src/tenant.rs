// crates/prompt-gate-core/src/tenant.rs
// ============================================================================
// Module: Tenant Snapshot
// Description: Read-only tenant state resolved during authentication.
// Purpose: Carry quota and provider fields from the external store.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Tenant`] is the gateway's short-lived, possibly-stale snapshot of an
//! authenticated caller. The authoritative copy lives in the external tenant
//! store; the gateway only reads it, caches it briefly, and never writes it
//! back. `used_quota` is incremented by the forwarding collaborator and
//! resets at week boundaries outside this process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Provider Kind
// ============================================================================

/// Upstream completion provider a tenant is routed to.
///
/// # Invariants
/// - Variants are stable for serialization and store round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI-compatible endpoint.
    OpenAi,
    /// OpenRouter aggregation endpoint.
    OpenRouter,
    /// DeepSeek endpoint.
    DeepSeek,
    /// In-process mock used for tests and local development.
    Mock,
}

// ============================================================================
// SECTION: Tenant
// ============================================================================

/// Read-only tenant snapshot resolved from a credential.
///
/// # Invariants
/// - `credential_hash` is a one-way hash; the raw credential is never
///   stored, cached, or logged.
/// - `used_quota` is monotonically non-decreasing within a week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Stable tenant identifier.
    pub id: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Contact email.
    pub email: String,
    /// One-way hash of the tenant credential.
    pub credential_hash: String,
    /// Creation time in unix epoch milliseconds.
    pub created_at_unix_ms: i64,
    /// Token budget for the current academic week.
    pub week_quota: u64,
    /// Tokens already consumed this week.
    pub used_quota: u64,
    /// Optional tenant-supplied upstream credential.
    pub provider_credential: Option<String>,
    /// Upstream provider this tenant is routed to.
    pub provider_kind: ProviderKind,
}
