// crates/prompt-gate-core/src/trace.rs
// ============================================================================
// Module: Trace Context
// Description: W3C-style trace context values for request correlation.
// Purpose: Generate, parse, and derive per-request trace identifiers.
// Dependencies: rand, thiserror
// ============================================================================

//! ## Overview
//! A [`TraceContext`] is the immutable identifier pair threaded through a
//! single request: a 16-byte trace id shared by every hop of the logical
//! request and an 8-byte parent id naming the current hop. Contexts are
//! parsed from the `traceparent` header or generated fresh, and a child is
//! derived before the request is processed so downstream calls see this
//! service as the parent span.
//!
//! ## Invariants
//! - `trace_id` is exactly 32 lowercase hex characters.
//! - `parent_id` is exactly 16 lowercase hex characters.
//! - `version` is exactly 2 lowercase hex characters.
//! - Construction fails rather than producing a partially-valid value.
//!
//! Security posture: header values are untrusted; malformed input degrades
//! to "generate a fresh context" and is never surfaced as an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Request and response header carrying the serialized trace context.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Exact hex length of the version field.
const VERSION_LEN: usize = 2;
/// Exact hex length of the trace identifier field.
const TRACE_ID_LEN: usize = 32;
/// Exact hex length of the parent identifier field.
const PARENT_ID_LEN: usize = 16;
/// Exact hex length of the flags field.
const FLAGS_LEN: usize = 2;

/// Default version emitted for generated contexts.
const DEFAULT_VERSION: &str = "00";
/// Default flags for generated contexts (sampled bit set).
const DEFAULT_FLAGS: u8 = 0x01;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Validation failures raised at trace context construction.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceContextError {
    /// Trace identifier is not exactly 32 lowercase hex characters.
    #[error("trace_id must be 32 lowercase hex characters")]
    InvalidTraceId,
    /// Parent identifier is not exactly 16 lowercase hex characters.
    #[error("parent_id must be 16 lowercase hex characters")]
    InvalidParentId,
    /// Version is not exactly 2 lowercase hex characters.
    #[error("version must be 2 lowercase hex characters")]
    InvalidVersion,
}

// ============================================================================
// SECTION: Trace Context
// ============================================================================

/// Immutable distributed-trace identifier pair for one request hop.
///
/// # Invariants
/// - Field formats are enforced at construction; instances are always valid.
/// - Values are owned by the request-processing scope and never shared
///   across concurrent requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    /// Version field, 2 lowercase hex characters.
    version: String,
    /// Trace identifier, 32 lowercase hex characters.
    trace_id: String,
    /// Parent (span) identifier, 16 lowercase hex characters.
    parent_id: String,
    /// Trace flags byte; bit 0 is the sampled bit.
    flags: u8,
}

impl TraceContext {
    /// Creates a validated trace context.
    ///
    /// Hex fields are lower-cased before validation.
    ///
    /// # Errors
    ///
    /// Returns [`TraceContextError`] when any field violates its format.
    pub fn new(
        version: &str,
        trace_id: &str,
        parent_id: &str,
        flags: u8,
    ) -> Result<Self, TraceContextError> {
        let version = version.to_ascii_lowercase();
        let trace_id = trace_id.to_ascii_lowercase();
        let parent_id = parent_id.to_ascii_lowercase();
        if !is_lower_hex(&version, VERSION_LEN) {
            return Err(TraceContextError::InvalidVersion);
        }
        if !is_lower_hex(&trace_id, TRACE_ID_LEN) {
            return Err(TraceContextError::InvalidTraceId);
        }
        if !is_lower_hex(&parent_id, PARENT_ID_LEN) {
            return Err(TraceContextError::InvalidParentId);
        }
        Ok(Self {
            version,
            trace_id,
            parent_id,
            flags,
        })
    }

    /// Generates a fresh context with cryptographically random identifiers.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            trace_id: random_hex::<16>(),
            parent_id: random_hex::<8>(),
            flags: DEFAULT_FLAGS,
        }
    }

    /// Parses a `traceparent` header value.
    ///
    /// Returns `None` on any structural violation: wrong field count, wrong
    /// field length, non-hex characters, or unparsable flags. Invalid input
    /// signals "generate a fresh context instead" and is never an error.
    #[must_use]
    pub fn parse(header_value: &str) -> Option<Self> {
        let trimmed = header_value.trim();
        let parts: Vec<&str> = trimmed.split('-').collect();
        let [version, trace_id, parent_id, flags_hex] = parts.as_slice() else {
            return None;
        };
        if flags_hex.len() != FLAGS_LEN {
            return None;
        }
        let flags = u8::from_str_radix(flags_hex, 16).ok()?;
        Self::new(version, trace_id, parent_id, flags).ok()
    }

    /// Derives a child context: same trace id, version, and flags, with a
    /// freshly generated parent id.
    #[must_use]
    pub fn derive_child(&self) -> Self {
        Self {
            version: self.version.clone(),
            trace_id: self.trace_id.clone(),
            parent_id: random_hex::<8>(),
            flags: self.flags,
        }
    }

    /// Serializes the context into `traceparent` header form.
    #[must_use]
    pub fn to_traceparent(&self) -> String {
        format!(
            "{}-{}-{}-{:02x}",
            self.version, self.trace_id, self.parent_id, self.flags
        )
    }

    /// Returns the version field.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the trace identifier.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Returns the parent (span) identifier.
    #[must_use]
    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    /// Returns the flags byte.
    #[must_use]
    pub const fn flags(&self) -> u8 {
        self.flags
    }

    /// Returns true when the sampled bit is set.
    #[must_use]
    pub const fn is_sampled(&self) -> bool {
        self.flags & 0x01 == 0x01
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_traceparent())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when `value` is exactly `len` lowercase hex characters.
fn is_lower_hex(value: &str, len: usize) -> bool {
    value.len() == len
        && value
            .chars()
            .all(|ch| ch.is_ascii_digit() || ('a'..='f').contains(&ch))
}

/// Produces `2 * N` lowercase hex characters from OS randomness.
fn random_hex<const N: usize>() -> String {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    let mut out = String::with_capacity(N * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
