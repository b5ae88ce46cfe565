// crates/prompt-gate-gateway/src/metrics.rs
// ============================================================================
// Module: Metrics Aggregator
// Description: Thread-safe counters and gauges for gateway observability.
// Purpose: Provide summary and scrape-format views without hard deps.
// Dependencies: serde, std
// ============================================================================

//! ## Overview
//! The aggregator keeps per-endpoint request counters, provider health and
//! request counts, quota check/exceeded counts, and typed error counters.
//! All mutating operations serialize through a single mutex; every operation
//! is O(1) and metrics sit off the latency-critical path beyond a counter
//! increment. Derived aggregates (average latency, error rate) are computed
//! on read, and the exposition view renders the same state in the plain-text
//! line format understood by periodic scrapers.
//!
//! ## Invariants
//! - Snapshots are assembled on demand and never persisted.
//! - Map keys are `BTreeMap`-ordered so exposition output is deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;

// ============================================================================
// SECTION: Inner State
// ============================================================================

/// Counters for one endpoint.
#[derive(Debug, Clone, Copy, Default)]
struct EndpointCounters {
    /// Requests observed.
    count: u64,
    /// Cumulative request duration.
    total_duration: Duration,
    /// Responses with status >= 400.
    errors: u64,
}

/// Mutable aggregator state behind the lock.
#[derive(Debug, Default)]
struct MetricsInner {
    /// Per-endpoint request counters.
    requests: BTreeMap<String, EndpointCounters>,
    /// Provider health flags.
    provider_health: BTreeMap<String, bool>,
    /// Per-provider request counts.
    provider_requests: BTreeMap<String, u64>,
    /// Quota checks performed.
    quota_checks: u64,
    /// Quota checks that found the budget exhausted.
    quota_exceeded: u64,
    /// Typed error counters.
    errors: BTreeMap<String, u64>,
}

// ============================================================================
// SECTION: Summary Views
// ============================================================================

/// Per-endpoint latency block in the summary.
///
/// # Invariants
/// - Present only for endpoints with at least one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EndpointSummary {
    /// Requests observed.
    pub count: u64,
    /// Average request duration in milliseconds, rounded to two decimals.
    pub avg_duration_ms: f64,
    /// Responses with status >= 400.
    pub error_count: u64,
}

/// Per-provider block in the summary.
///
/// # Invariants
/// - `healthy` defaults to false for providers seen only via requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProviderSummary {
    /// Last reported health flag.
    pub healthy: bool,
    /// Requests routed to this provider.
    pub requests: u64,
}

/// Quota counter block in the summary.
///
/// # Invariants
/// - `exceeded <= checks` at every observation point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuotaSummary {
    /// Quota checks performed.
    pub checks: u64,
    /// Checks that found the budget exhausted.
    pub exceeded: u64,
    /// `exceeded / checks`, rounded to four decimals.
    pub exceeded_rate: f64,
}

/// Aggregated read-only metrics view assembled on demand.
///
/// # Invariants
/// - Derived fields are computed from the live counters at call time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    /// Seconds since aggregator construction, rounded to two decimals.
    pub uptime_seconds: f64,
    /// Total requests across all endpoints.
    pub total_requests: u64,
    /// Total error responses across all endpoints.
    pub total_errors: u64,
    /// `total_errors / total_requests`, rounded to four decimals.
    pub error_rate: f64,
    /// Mean latency across all endpoints in milliseconds.
    pub average_latency_ms: f64,
    /// Per-endpoint latency blocks.
    pub endpoints: BTreeMap<String, EndpointSummary>,
    /// Per-provider blocks.
    pub providers: BTreeMap<String, ProviderSummary>,
    /// Quota counter block.
    pub quota: QuotaSummary,
    /// Typed error counters.
    pub errors_by_type: BTreeMap<String, u64>,
}

// ============================================================================
// SECTION: Aggregator
// ============================================================================

/// Thread-safe metrics aggregator shared across request handling.
#[derive(Debug)]
pub struct MetricsAggregator {
    /// Counter state behind a single lock.
    inner: Mutex<MetricsInner>,
    /// Construction instant for uptime reporting.
    start: Instant,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsInner::default()),
            start: Instant::now(),
        }
    }

    /// Records one request against `endpoint`.
    pub fn record_request(&self, endpoint: &str, duration: Duration, status: u16) {
        if let Ok(mut inner) = self.inner.lock() {
            let counters = inner.requests.entry(endpoint.to_string()).or_default();
            counters.count += 1;
            counters.total_duration += duration;
            if status >= 400 {
                counters.errors += 1;
            }
        }
    }

    /// Records one request routed to `provider`.
    pub fn record_provider_request(&self, provider: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            *inner.provider_requests.entry(provider.to_string()).or_default() += 1;
        }
    }

    /// Updates the health flag for `provider`.
    pub fn update_provider_health(&self, provider: &str, healthy: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.provider_health.insert(provider.to_string(), healthy);
        }
    }

    /// Records a quota check and whether it found the budget exhausted.
    pub fn record_quota_check(&self, exceeded: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.quota_checks += 1;
            if exceeded {
                inner.quota_exceeded += 1;
            }
        }
    }

    /// Increments the typed error counter for `kind`.
    pub fn record_error(&self, kind: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            *inner.errors.entry(kind.to_string()).or_default() += 1;
        }
    }

    /// Computes the aggregated summary view.
    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        let uptime_seconds = round2(self.start.elapsed().as_secs_f64());
        let Ok(inner) = self.inner.lock() else {
            return empty_summary(uptime_seconds);
        };
        let total_requests: u64 = inner.requests.values().map(|c| c.count).sum();
        let total_errors: u64 = inner.requests.values().map(|c| c.errors).sum();
        let total_duration: Duration = inner.requests.values().map(|c| c.total_duration).sum();
        let average_latency_ms = if total_requests > 0 {
            round2(total_duration.as_secs_f64() * 1_000.0 / divisor(total_requests))
        } else {
            0.0
        };
        let error_rate = if total_requests > 0 {
            round4(divisor(total_errors) / divisor(total_requests))
        } else {
            0.0
        };
        let endpoints = inner
            .requests
            .iter()
            .filter(|(_, counters)| counters.count > 0)
            .map(|(endpoint, counters)| {
                (
                    endpoint.clone(),
                    EndpointSummary {
                        count: counters.count,
                        avg_duration_ms: round2(
                            counters.total_duration.as_secs_f64() * 1_000.0
                                / divisor(counters.count),
                        ),
                        error_count: counters.errors,
                    },
                )
            })
            .collect();
        let mut providers: BTreeMap<String, ProviderSummary> = BTreeMap::new();
        for (name, healthy) in &inner.provider_health {
            providers.insert(
                name.clone(),
                ProviderSummary {
                    healthy: *healthy,
                    requests: inner.provider_requests.get(name).copied().unwrap_or(0),
                },
            );
        }
        for (name, requests) in &inner.provider_requests {
            providers.entry(name.clone()).or_insert(ProviderSummary {
                healthy: false,
                requests: *requests,
            });
        }
        let exceeded_rate = if inner.quota_checks > 0 {
            round4(divisor(inner.quota_exceeded) / divisor(inner.quota_checks))
        } else {
            0.0
        };
        MetricsSummary {
            uptime_seconds,
            total_requests,
            total_errors,
            error_rate,
            average_latency_ms,
            endpoints,
            providers,
            quota: QuotaSummary {
                checks: inner.quota_checks,
                exceeded: inner.quota_exceeded,
                exceeded_rate,
            },
            errors_by_type: inner.errors.clone(),
        }
    }

    /// Renders the scrape-format exposition view: one line per sample with
    /// typed comment headers per metric family.
    #[must_use]
    pub fn exposition(&self) -> String {
        let uptime_seconds = round2(self.start.elapsed().as_secs_f64());
        let Ok(inner) = self.inner.lock() else {
            return String::new();
        };
        let mut out = String::new();
        push_line(&mut out, "# HELP gateway_requests_total Total number of requests");
        push_line(&mut out, "# TYPE gateway_requests_total counter");
        for (endpoint, counters) in &inner.requests {
            push_line(
                &mut out,
                &format!("gateway_requests_total{{endpoint=\"{endpoint}\"}} {}", counters.count),
            );
        }
        push_line(
            &mut out,
            "\n# HELP gateway_request_duration_seconds Total request duration",
        );
        push_line(&mut out, "# TYPE gateway_request_duration_seconds counter");
        for (endpoint, counters) in &inner.requests {
            push_line(
                &mut out,
                &format!(
                    "gateway_request_duration_seconds{{endpoint=\"{endpoint}\"}} {}",
                    counters.total_duration.as_secs_f64()
                ),
            );
        }
        push_line(&mut out, "\n# HELP gateway_errors_total Total number of errors");
        push_line(&mut out, "# TYPE gateway_errors_total counter");
        let total_errors: u64 = inner.requests.values().map(|c| c.errors).sum();
        push_line(&mut out, &format!("gateway_errors_total{{}} {total_errors}"));
        push_line(
            &mut out,
            "\n# HELP gateway_provider_health Provider health status (1=healthy, 0=unhealthy)",
        );
        push_line(&mut out, "# TYPE gateway_provider_health gauge");
        for (provider, healthy) in &inner.provider_health {
            let value = u8::from(*healthy);
            push_line(
                &mut out,
                &format!("gateway_provider_health{{provider=\"{provider}\"}} {value}"),
            );
        }
        push_line(
            &mut out,
            "\n# HELP gateway_provider_requests_total Total requests per provider",
        );
        push_line(&mut out, "# TYPE gateway_provider_requests_total counter");
        for (provider, count) in &inner.provider_requests {
            push_line(
                &mut out,
                &format!("gateway_provider_requests_total{{provider=\"{provider}\"}} {count}"),
            );
        }
        push_line(&mut out, "\n# HELP gateway_quota_checks_total Total quota checks");
        push_line(&mut out, "# TYPE gateway_quota_checks_total counter");
        push_line(
            &mut out,
            &format!("gateway_quota_checks_total{{}} {}", inner.quota_checks),
        );
        push_line(
            &mut out,
            "\n# HELP gateway_quota_exceeded_total Total quota exceeded events",
        );
        push_line(&mut out, "# TYPE gateway_quota_exceeded_total counter");
        push_line(
            &mut out,
            &format!("gateway_quota_exceeded_total{{}} {}", inner.quota_exceeded),
        );
        push_line(&mut out, "\n# HELP gateway_uptime_seconds Gateway uptime in seconds");
        push_line(&mut out, "# TYPE gateway_uptime_seconds gauge");
        push_line(&mut out, &format!("gateway_uptime_seconds{{}} {uptime_seconds}"));
        out
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Appends one exposition line plus newline.
fn push_line(out: &mut String, line: &str) {
    let _ = writeln!(out, "{line}");
}

/// Converts a counter into a floating divisor for derived ratios.
#[allow(
    clippy::cast_precision_loss,
    reason = "Counters stay far below 2^52; ratios are for reporting only."
)]
const fn divisor(value: u64) -> f64 {
    value as f64
}

/// Rounds to two decimals.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds to four decimals.
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Summary returned when the lock is poisoned; counters read as zero.
fn empty_summary(uptime_seconds: f64) -> MetricsSummary {
    MetricsSummary {
        uptime_seconds,
        total_requests: 0,
        total_errors: 0,
        error_rate: 0.0,
        average_latency_ms: 0.0,
        endpoints: BTreeMap::new(),
        providers: BTreeMap::new(),
        quota: QuotaSummary {
            checks: 0,
            exceeded: 0,
            exceeded_rate: 0.0,
        },
        errors_by_type: BTreeMap::new(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
