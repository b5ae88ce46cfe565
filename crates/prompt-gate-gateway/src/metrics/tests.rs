// crates/prompt-gate-gateway/src/metrics/tests.rs
// ============================================================================
// Module: Metrics Aggregator Unit Tests
// Description: Unit tests for counter recording and derived views.
// Purpose: Validate summary math and exposition line format.
// Dependencies: prompt-gate-gateway
// ============================================================================

//! ## Overview
//! Exercises counter recording, derived ratio math, and the scrape-format
//! rendering of the same state.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use super::MetricsAggregator;

#[test]
fn summary_reports_per_endpoint_averages() {
    let metrics = MetricsAggregator::new();
    metrics.record_request("/v1/chat/completions", Duration::from_millis(100), 200);
    metrics.record_request("/v1/chat/completions", Duration::from_millis(200), 200);
    metrics.record_request("/health", Duration::from_millis(10), 200);
    let summary = metrics.summary();
    assert_eq!(summary.total_requests, 3);
    assert_eq!(summary.total_errors, 0);
    let chat = &summary.endpoints["/v1/chat/completions"];
    assert_eq!(chat.count, 2);
    assert!((chat.avg_duration_ms - 150.0).abs() < f64::EPSILON);
}

#[test]
fn error_rate_counts_status_400_and_above() {
    let metrics = MetricsAggregator::new();
    metrics.record_request("/v1/chat/completions", Duration::from_millis(5), 200);
    metrics.record_request("/v1/chat/completions", Duration::from_millis(5), 429);
    metrics.record_request("/v1/chat/completions", Duration::from_millis(5), 502);
    metrics.record_request("/v1/chat/completions", Duration::from_millis(5), 399);
    let summary = metrics.summary();
    assert_eq!(summary.total_errors, 2);
    assert!((summary.error_rate - 0.5).abs() < f64::EPSILON);
}

#[test]
fn quota_counters_track_exceeded_rate() {
    let metrics = MetricsAggregator::new();
    metrics.record_quota_check(false);
    metrics.record_quota_check(false);
    metrics.record_quota_check(true);
    let summary = metrics.summary();
    assert_eq!(summary.quota.checks, 3);
    assert_eq!(summary.quota.exceeded, 1);
    assert!((summary.quota.exceeded_rate - 0.3333).abs() < f64::EPSILON);
}

#[test]
fn provider_blocks_merge_health_and_request_counts() {
    let metrics = MetricsAggregator::new();
    metrics.update_provider_health("openrouter", true);
    metrics.record_provider_request("openrouter");
    metrics.record_provider_request("openrouter");
    metrics.record_provider_request("deepseek");
    let summary = metrics.summary();
    let openrouter = &summary.providers["openrouter"];
    assert!(openrouter.healthy);
    assert_eq!(openrouter.requests, 2);
    // Seen only via requests, so health defaults to false.
    let deepseek = &summary.providers["deepseek"];
    assert!(!deepseek.healthy);
    assert_eq!(deepseek.requests, 1);
}

#[test]
fn typed_error_counters_accumulate_by_kind() {
    let metrics = MetricsAggregator::new();
    metrics.record_error("rule_match_timeout");
    metrics.record_error("rule_match_timeout");
    metrics.record_error("invalid_rule_pattern");
    let summary = metrics.summary();
    assert_eq!(summary.errors_by_type["rule_match_timeout"], 2);
    assert_eq!(summary.errors_by_type["invalid_rule_pattern"], 1);
}

#[test]
fn exposition_renders_labeled_counter_lines() {
    let metrics = MetricsAggregator::new();
    metrics.record_request("/v1/chat/completions", Duration::from_millis(50), 200);
    metrics.record_request("/v1/chat/completions", Duration::from_millis(50), 500);
    metrics.update_provider_health("openrouter", true);
    metrics.record_provider_request("openrouter");
    metrics.record_quota_check(true);
    let text = metrics.exposition();
    assert!(text.contains("# TYPE gateway_requests_total counter"));
    assert!(text.contains("gateway_requests_total{endpoint=\"/v1/chat/completions\"} 2"));
    assert!(text.contains("gateway_errors_total{} 1"));
    assert!(text.contains("gateway_provider_health{provider=\"openrouter\"} 1"));
    assert!(text.contains("gateway_provider_requests_total{provider=\"openrouter\"} 1"));
    assert!(text.contains("gateway_quota_checks_total{} 1"));
    assert!(text.contains("gateway_quota_exceeded_total{} 1"));
    assert!(text.contains("# TYPE gateway_uptime_seconds gauge"));
}

#[test]
fn empty_aggregator_reports_zeroed_ratios() {
    let metrics = MetricsAggregator::new();
    let summary = metrics.summary();
    assert_eq!(summary.total_requests, 0);
    assert!((summary.error_rate).abs() < f64::EPSILON);
    assert!((summary.average_latency_ms).abs() < f64::EPSILON);
    assert!(summary.endpoints.is_empty());
}
