// crates/prompt-gate-gateway/src/lib.rs
// ============================================================================
// Module: Prompt Gate Gateway
// Description: Serving layer for the multi-tenant completion gateway.
// Purpose: Wire admission, auth, rules, quota, and metrics behind axum.
// Dependencies: prompt-gate-core, axum, tokio, reqwest, regex, sha2, subtle
// ============================================================================

//! ## Overview
//! `prompt-gate-gateway` is the serving layer in front of a third-party
//! completion API. Every inbound chat request is admitted under a dual-pool
//! concurrency budget, authenticated through a TTL-cached credential
//! resolver, checked against its weekly token budget, and screened by the
//! moderation rule engine before the upstream forwarder is consulted.
//!
//! ## Layer Responsibilities
//! - Enforce the fixed per-request ordering: admission, auth, quota, rules,
//!   forward, release.
//! - Translate domain failures into the HTTP error taxonomy.
//! - Keep all shared state explicitly constructed and injected; no global
//!   singletons.
//!
//! Security posture: bearer credentials, prompt text, and trace headers are
//! untrusted input; credentials are hashed before use and pattern matching
//! is time-bounded.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod admission;
pub mod auth;
pub mod cache;
pub mod config;
pub mod engine;
pub mod forward;
pub mod metrics;
pub mod server;
pub mod store;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use admission::AdmissionController;
pub use admission::RequestKind;
pub use auth::AdminToken;
pub use auth::AuthResolver;
pub use cache::TtlCache;
pub use config::GatewayConfig;
pub use engine::RuleEngine;
pub use metrics::MetricsAggregator;
pub use server::GatewayState;
pub use store::TenantStore;
