// crates/prompt-gate-gateway/src/auth.rs
// ============================================================================
// Module: Authentication Resolver
// Description: Bearer credential resolution and admin token verification.
// Purpose: Avoid store round trips on the common path; fail closed otherwise.
// Dependencies: axum, prompt-gate-core, sha2, subtle, thiserror
// ============================================================================

//! ## Overview
//! Tenant authentication hashes the presented bearer credential and resolves
//! it through a TTL-bounded cache before falling back to the external store.
//! Raw credentials are never cached or logged; only their one-way hash
//! leaves this module. The privileged admin path is separate and simpler: a
//! single token loaded from configuration, compared in constant time so
//! response latency cannot be used to enumerate valid prefixes.
//!
//! ## Invariants
//! - Every admin verification failure yields the same generic error
//!   regardless of cause.
//! - Cache keys are credential hashes, never raw credentials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use prompt_gate_core::Tenant;

use crate::cache::TtlCache;
use crate::store::StoreError;
use crate::store::TenantStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default TTL for the credential cache.
pub const DEFAULT_KEY_CACHE_TTL: Duration = Duration::from_secs(60);
/// Default capacity bound for the credential cache.
pub const DEFAULT_KEY_CACHE_CAPACITY: usize = 10_000;

/// Bearer scheme prefix in the `Authorization` header.
const BEARER_PREFIX: &str = "Bearer ";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication failures for the tenant path.
///
/// # Invariants
/// - Variants are stable for HTTP mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Missing or unknown tenant credential.
    #[error("invalid or missing API key")]
    Unauthenticated,
    /// The external tenant store failed during resolution.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Authorization failure for the privileged admin path.
///
/// The message is fixed and generic by design; any mismatch, including a
/// missing token, yields this identical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid or missing admin token")]
pub struct Unauthorized;

// ============================================================================
// SECTION: Credential Helpers
// ============================================================================

/// Extracts the bearer credential from the `Authorization` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Hashes a raw credential with SHA-256 and returns the lowercase hex
/// digest. The hash is the only form the credential takes past this point.
#[must_use]
pub fn hash_credential(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

// ============================================================================
// SECTION: Auth Resolver
// ============================================================================

/// Resolves bearer credentials to tenant snapshots through a TTL cache.
pub struct AuthResolver {
    /// Credential-hash to tenant snapshot cache.
    cache: TtlCache<String, Tenant>,
    /// External tenant store consulted on cache miss.
    store: Arc<dyn TenantStore>,
}

impl AuthResolver {
    /// Creates a resolver over `store` with the given cache parameters.
    #[must_use]
    pub fn new(store: Arc<dyn TenantStore>, cache_ttl: Duration, cache_capacity: usize) -> Self {
        Self {
            cache: TtlCache::new(cache_ttl, cache_capacity),
            store,
        }
    }

    /// Resolves the request's bearer credential to a tenant snapshot.
    ///
    /// A non-expired cache hit returns without touching the store. On miss
    /// the store is queried by hash and a found tenant re-populates the
    /// cache.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] when the credential is absent
    /// or unknown, and [`AuthError::Store`] when the store query fails.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Tenant, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::Unauthenticated)?;
        let hash = hash_credential(&token);
        if let Some(tenant) = self.cache.get(&hash) {
            return Ok(tenant);
        }
        let tenant = self
            .store
            .find_by_credential_hash(&hash)
            .await?
            .ok_or(AuthError::Unauthenticated)?;
        self.cache.insert(hash, tenant.clone());
        Ok(tenant)
    }

    /// Number of live cache entries, for health and test observation.
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

// ============================================================================
// SECTION: Admin Token
// ============================================================================

/// Privileged admin credential loaded once from configuration.
///
/// # Invariants
/// - The expected token is trimmed of surrounding whitespace at load time.
/// - Verification runs in constant time over fixed-length digests, so
///   neither token length nor matching prefix length leaks through timing.
#[derive(Clone)]
pub struct AdminToken {
    /// SHA-256 digest of the expected token.
    expected_digest: [u8; 32],
}

impl AdminToken {
    /// Creates an admin token from configuration text, trimming surrounding
    /// whitespace.
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            expected_digest: Sha256::digest(token.trim().as_bytes()).into(),
        }
    }

    /// Verifies a presented token in constant time.
    ///
    /// An absent token is substituted with the empty string so the
    /// comparison work is identical in every case.
    ///
    /// # Errors
    ///
    /// Returns the generic [`Unauthorized`] on any mismatch.
    pub fn verify(&self, presented: Option<&str>) -> Result<(), Unauthorized> {
        let presented_digest: [u8; 32] =
            Sha256::digest(presented.unwrap_or_default().as_bytes()).into();
        if bool::from(self.expected_digest.ct_eq(&presented_digest)) {
            Ok(())
        } else {
            Err(Unauthorized)
        }
    }

    /// Verifies the bearer token carried by `headers` in constant time.
    ///
    /// # Errors
    ///
    /// Returns the generic [`Unauthorized`] on any mismatch.
    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<(), Unauthorized> {
        let token = bearer_token(headers);
        self.verify(token.as_deref())
    }
}

impl std::fmt::Debug for AdminToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The digest is deliberately not rendered.
        f.debug_struct("AdminToken").finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
