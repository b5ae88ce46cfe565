// crates/prompt-gate-gateway/src/admission.rs
// ============================================================================
// Module: Admission Controller
// Description: Dual-pool concurrency gate separating streaming traffic.
// Purpose: Keep long-lived streams from starving fast non-streaming requests.
// Dependencies: tokio, serde
// ============================================================================

//! ## Overview
//! The admission controller is the outermost gate on every request. Two
//! independent fixed-capacity pools back it: a small one for long-lived
//! streaming connections and a larger one for fast non-streaming requests,
//! so saturation of one never starves the other. Acquisition waits a bounded
//! time (default 5 s); elapsing the wait is a signaled *rejection* to be
//! translated into a backpressure response by the caller, not an error, and
//! it is never retried internally.
//!
//! ## Invariants
//! - Active count per pool never exceeds the configured limit.
//! - Every successful acquire is matched by exactly one release; the
//!   returned permit releases on drop so error and cancellation paths are
//!   covered structurally.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::timeout;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default concurrent limit for the streaming pool.
pub const DEFAULT_STREAMING_LIMIT: usize = 50;
/// Default concurrent limit for the normal pool.
pub const DEFAULT_NORMAL_LIMIT: usize = 200;
/// Default bounded wait for slot acquisition.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SECTION: Request Kind
// ============================================================================

/// Traffic class used to select an admission pool.
///
/// # Invariants
/// - Variants are stable for stats labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Long-lived streaming completion request.
    Streaming,
    /// Fast non-streaming request.
    Normal,
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Admission controller pool sizes and bounded wait.
///
/// # Invariants
/// - Limits must be non-zero for the corresponding pool to admit anything.
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Concurrent limit for the streaming pool.
    pub streaming_limit: usize,
    /// Concurrent limit for the normal pool.
    pub normal_limit: usize,
    /// Bounded wait applied to every acquisition.
    pub acquire_timeout: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            streaming_limit: DEFAULT_STREAMING_LIMIT,
            normal_limit: DEFAULT_NORMAL_LIMIT,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

// ============================================================================
// SECTION: Pool State
// ============================================================================

/// One fixed-capacity pool plus its lifetime counters.
#[derive(Debug)]
struct Pool {
    /// Semaphore bounding concurrent holders.
    slots: Semaphore,
    /// Configured limit, kept for stats.
    limit: usize,
    /// Currently held slots.
    active: AtomicU64,
    /// Lifetime successful acquisitions.
    admitted: AtomicU64,
    /// Lifetime bounded-wait rejections.
    rejected: AtomicU64,
}

impl Pool {
    /// Creates a pool with `limit` slots.
    fn new(limit: usize) -> Self {
        Self {
            slots: Semaphore::new(limit),
            limit,
            active: AtomicU64::new(0),
            admitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Snapshot of this pool for stats reporting.
    fn stats(&self) -> PoolStats {
        let active = self.active.load(Ordering::Relaxed);
        let limit = u64::try_from(self.limit).unwrap_or(u64::MAX);
        PoolStats {
            active,
            limit,
            available: limit.saturating_sub(active),
            utilization: utilization(active, limit),
            total_admitted: self.admitted.load(Ordering::Relaxed),
            total_rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// SECTION: Stats
// ============================================================================

/// Per-pool admission statistics.
///
/// # Invariants
/// - `active <= limit` at every observation point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoolStats {
    /// Currently held slots.
    pub active: u64,
    /// Configured limit.
    pub limit: u64,
    /// Remaining free slots.
    pub available: u64,
    /// `active / limit`, rounded to four decimals; zero for an empty pool.
    pub utilization: f64,
    /// Lifetime successful acquisitions.
    pub total_admitted: u64,
    /// Lifetime bounded-wait rejections.
    pub total_rejected: u64,
}

/// Combined capacity view across both pools.
///
/// # Invariants
/// - Totals are sums of the per-pool values at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapacityStats {
    /// Total active slots across both pools.
    pub total_active: u64,
    /// Total configured capacity across both pools.
    pub total_limit: u64,
    /// Combined utilization, rounded to four decimals.
    pub total_utilization: f64,
}

/// Full admission controller statistics snapshot.
///
/// # Invariants
/// - Assembled on demand; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdmissionStats {
    /// Streaming pool statistics.
    pub streaming: PoolStats,
    /// Normal pool statistics.
    pub normal: PoolStats,
    /// Combined capacity view.
    pub capacity: CapacityStats,
}

// ============================================================================
// SECTION: Admission Controller
// ============================================================================

/// Dual-pool admission gate with bounded-wait acquisition.
#[derive(Debug)]
pub struct AdmissionController {
    /// Pool for streaming requests.
    streaming: Pool,
    /// Pool for non-streaming requests.
    normal: Pool,
    /// Bounded wait applied to every acquisition.
    acquire_timeout: Duration,
}

impl AdmissionController {
    /// Creates a controller from the given configuration.
    #[must_use]
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            streaming: Pool::new(config.streaming_limit),
            normal: Pool::new(config.normal_limit),
            acquire_timeout: config.acquire_timeout,
        }
    }

    /// Attempts to obtain a slot from the pool matching `kind` within the
    /// bounded wait.
    ///
    /// Returns `None` when the wait elapses; the pool's rejection counter is
    /// incremented exactly once and nothing else changes. The permit
    /// releases its slot when dropped.
    pub async fn acquire(&self, kind: RequestKind) -> Option<AdmissionPermit<'_>> {
        let pool = self.pool(kind);
        match timeout(self.acquire_timeout, pool.slots.acquire()).await {
            Ok(Ok(permit)) => {
                // The semaphore slot is handed to the AdmissionPermit and
                // returned via add_permits on drop.
                permit.forget();
                pool.active.fetch_add(1, Ordering::Relaxed);
                pool.admitted.fetch_add(1, Ordering::Relaxed);
                Some(AdmissionPermit {
                    controller: self,
                    kind,
                })
            }
            // Semaphore closure and an elapsed wait both surface as rejection.
            Ok(Err(_)) | Err(_) => {
                pool.rejected.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Returns a statistics snapshot across both pools.
    #[must_use]
    pub fn stats(&self) -> AdmissionStats {
        let streaming = self.streaming.stats();
        let normal = self.normal.stats();
        let total_active = streaming.active + normal.active;
        let total_limit = streaming.limit + normal.limit;
        AdmissionStats {
            streaming,
            normal,
            capacity: CapacityStats {
                total_active,
                total_limit,
                total_utilization: utilization(total_active, total_limit),
            },
        }
    }

    /// Returns the pool backing `kind`.
    const fn pool(&self, kind: RequestKind) -> &Pool {
        match kind {
            RequestKind::Streaming => &self.streaming,
            RequestKind::Normal => &self.normal,
        }
    }

    /// Returns the slot taken by a permit; invoked exactly once per
    /// successful acquire, from [`AdmissionPermit::drop`].
    fn release(&self, kind: RequestKind) {
        let pool = self.pool(kind);
        pool.slots.add_permits(1);
        let mut active = pool.active.load(Ordering::Relaxed);
        // Saturating decrement; a stray release must not wrap the gauge.
        while active > 0 {
            match pool.active.compare_exchange_weak(
                active,
                active - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => active = observed,
            }
        }
    }
}

// ============================================================================
// SECTION: Admission Permit
// ============================================================================

/// Held admission slot; releasing is tied to drop so error and
/// cancellation paths release exactly once.
#[derive(Debug)]
pub struct AdmissionPermit<'a> {
    /// Controller that issued the slot.
    controller: &'a AdmissionController,
    /// Pool the slot came from.
    kind: RequestKind,
}

impl AdmissionPermit<'_> {
    /// Returns the pool this permit belongs to.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.kind
    }
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.controller.release(self.kind);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Computes `active / limit` rounded to four decimals; zero when the
/// denominator is zero.
#[allow(
    clippy::cast_precision_loss,
    reason = "Pool limits are far below 2^52; the ratio is for reporting only."
)]
fn utilization(active: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    let ratio = active as f64 / limit as f64;
    (ratio * 10_000.0).round() / 10_000.0
}

// ============================================================================
// SECTION: Tests
// ============================================================================
