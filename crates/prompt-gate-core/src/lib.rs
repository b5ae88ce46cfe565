// crates/prompt-gate-core/src/lib.rs
// ============================================================================
// Module: Prompt Gate Core
// Description: Domain types and pure logic for the Prompt Gate gateway.
// Purpose: Provide trace, week-range, rule, tenant, and quota primitives.
// Dependencies: rand, serde, thiserror
// ============================================================================

//! ## Overview
//! `prompt-gate-core` holds the pure domain model shared by the gateway
//! serving layer: distributed trace contexts, academic week ranges, the
//! moderation rule model with its hardcoded fallback tables, tenant
//! snapshots, and the advisory quota guard. Nothing in this crate performs
//! I/O or touches an async runtime; construction-time validation is the only
//! enforcement boundary.
//!
//! ## Layer Responsibilities
//! - Validate value types at construction (no partially-valid objects).
//! - Keep rule and quota decisions deterministic for identical inputs.
//!
//! Security posture: trace headers and prompt text are untrusted input and
//! are validated or bounded by the consuming layer.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod quota;
pub mod rules;
pub mod tenant;
pub mod trace;
pub mod week;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use quota::QuotaExceeded;
pub use quota::QuotaGuard;
pub use rules::Rule;
pub use rules::RuleAction;
pub use rules::RuleKind;
pub use rules::RuleResult;
pub use tenant::ProviderKind;
pub use tenant::Tenant;
pub use trace::TRACEPARENT_HEADER;
pub use trace::TraceContext;
pub use trace::TraceContextError;
pub use week::WeekRange;
