// crates/prompt-gate-gateway/src/store.rs
// ============================================================================
// Module: Tenant Store Seam
// Description: Lookup interface over the external tenant store.
// Purpose: Provide a pluggable, read-only seam for credential resolution.
// Dependencies: async-trait, prompt-gate-core, thiserror
// ============================================================================

//! ## Overview
//! The gateway never owns tenant state; it reads snapshots through this
//! seam. The production implementation queries whatever persistence backs
//! the deployment; [`InMemoryTenantStore`] serves wiring and tests.
//!
//! ## Invariants
//! - Lookups are keyed by credential hash only; raw credentials never reach
//!   the store.
//! - A missing tenant is `Ok(None)`, not an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use prompt_gate_core::Tenant;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors emitted by tenant store implementations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not be reached or queried.
    #[error("tenant store unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// SECTION: Store Trait
// ============================================================================

/// Read-only lookup over the external tenant store.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Finds the tenant whose credential hashes to `credential_hash`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be queried; an unknown
    /// hash is `Ok(None)`.
    async fn find_by_credential_hash(
        &self,
        credential_hash: &str,
    ) -> Result<Option<Tenant>, StoreError>;

    /// Returns true when the store is reachable, for health reporting.
    async fn healthy(&self) -> bool;
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory tenant store for wiring and tests.
///
/// # Invariants
/// - Lookups clone snapshots; callers never observe interior mutation.
#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    /// Tenants keyed by credential hash.
    tenants: Mutex<HashMap<String, Tenant>>,
}

impl InMemoryTenantStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tenant under its credential hash.
    pub fn insert(&self, tenant: Tenant) {
        if let Ok(mut tenants) = self.tenants.lock() {
            tenants.insert(tenant.credential_hash.clone(), tenant);
        }
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn find_by_credential_hash(
        &self,
        credential_hash: &str,
    ) -> Result<Option<Tenant>, StoreError> {
        let tenants = self
            .tenants
            .lock()
            .map_err(|_| StoreError::Unavailable("tenant map poisoned".to_string()))?;
        Ok(tenants.get(credential_hash).cloned())
    }

    async fn healthy(&self) -> bool {
        true
    }
}
