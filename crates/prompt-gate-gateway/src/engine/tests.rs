// crates/prompt-gate-gateway/src/engine/tests.rs
// ============================================================================
// Module: Rule Engine Unit Tests
// Description: Unit tests for phased evaluation, fallback, and deadlines.
// Purpose: Validate block-before-guide ordering and degraded-match behavior.
// Dependencies: prompt-gate-core, prompt-gate-gateway, tokio
// ============================================================================

//! ## Overview
//! Exercises fallback-table evaluation across the legacy block window,
//! store-sourced rules with week scoping, invalid-pattern skipping, the
//! match deadline, and cache reload.

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

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use prompt_gate_core::Rule;
use prompt_gate_core::RuleAction;
use prompt_gate_core::RuleKind;

use crate::metrics::MetricsAggregator;

use super::DEFAULT_MATCH_TIMEOUT;
use super::DEFAULT_RULE_CACHE_TTL;
use super::RuleEngine;
use super::RuleSource;
use super::RuleSourceError;

/// Rule source that counts loads and serves a fixed rule list.
struct FixedSource {
    /// Rules returned on every load.
    rules: Vec<Rule>,
    /// Number of loads performed.
    loads: AtomicU64,
}

#[async_trait]
impl RuleSource for FixedSource {
    async fn load_rules(&self) -> Result<Vec<Rule>, RuleSourceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.rules.clone())
    }
}

/// Rule source that always fails.
struct BrokenSource;

#[async_trait]
impl RuleSource for BrokenSource {
    async fn load_rules(&self) -> Result<Vec<Rule>, RuleSourceError> {
        Err(RuleSourceError::Unavailable("connection refused".to_string()))
    }
}

/// Builds a stored rule with the given shape.
fn rule(id: &str, pattern: &str, kind: RuleKind, weeks: Option<&str>) -> Rule {
    Rule {
        id: id.to_string(),
        pattern: pattern.to_string(),
        kind,
        message: format!("matched {id}"),
        active_weeks: weeks.map(str::to_string),
        enabled: true,
    }
}

/// Builds an engine without a source, so the fallback tables apply.
fn fallback_engine() -> RuleEngine {
    RuleEngine::new(
        None,
        Arc::new(MetricsAggregator::new()),
        DEFAULT_RULE_CACHE_TTL,
        DEFAULT_MATCH_TIMEOUT,
    )
}

/// Builds an engine over a fixed source, returning the source handle too.
fn sourced_engine(rules: Vec<Rule>) -> (RuleEngine, Arc<FixedSource>) {
    let source = Arc::new(FixedSource {
        rules,
        loads: AtomicU64::new(0),
    });
    let metrics = Arc::new(MetricsAggregator::new());
    let engine = RuleEngine::new(
        Some(Arc::clone(&source) as Arc<dyn RuleSource>),
        metrics,
        DEFAULT_RULE_CACHE_TTL,
        DEFAULT_MATCH_TIMEOUT,
    );
    (engine, source)
}

#[tokio::test]
async fn fallback_blocks_code_requests_in_early_weeks() {
    let engine = fallback_engine();
    let result = engine.evaluate("帮我实现一个爬虫程序", 1).await;
    assert_eq!(result.action, RuleAction::Blocked);
    assert_eq!(result.rule_id.as_deref(), Some("hardcoded:帮我实现.+"));
    assert!(result.message.unwrap().contains("课程要求"));
}

#[tokio::test]
async fn fallback_block_window_closes_after_week_two() {
    let engine = fallback_engine();
    let result = engine.evaluate("帮我实现一个爬虫程序", 5).await;
    assert_eq!(result.action, RuleAction::Passed);
}

#[tokio::test]
async fn fallback_guides_in_any_week() {
    let engine = fallback_engine();
    let early = engine.evaluate("怎么学习", 1).await;
    let late = engine.evaluate("怎么学习", 12).await;
    assert_eq!(early.action, RuleAction::Guided);
    assert_eq!(late.action, RuleAction::Guided);
    assert_eq!(early.rule_id.as_deref(), Some("hardcoded:怎么.{2,5}$"));
}

#[tokio::test]
async fn unmatched_prompt_passes() {
    let engine = fallback_engine();
    let result = engine.evaluate("my sorting function panics on empty input", 1).await;
    assert_eq!(result.action, RuleAction::Passed);
}

#[tokio::test]
async fn stored_rules_respect_week_range_boundaries() {
    let (engine, _source) = sourced_engine(vec![rule(
        "r1",
        "give me the answer",
        RuleKind::Block,
        Some("1-3"),
    )]);
    assert_eq!(
        engine.evaluate("give me the answer", 1).await.action,
        RuleAction::Blocked
    );
    assert_eq!(
        engine.evaluate("give me the answer", 3).await.action,
        RuleAction::Blocked
    );
    assert_eq!(
        engine.evaluate("give me the answer", 4).await.action,
        RuleAction::Passed
    );
}

#[tokio::test]
async fn block_rules_win_over_guide_rules() {
    let (engine, _source) = sourced_engine(vec![
        rule("guide-1", "homework", RuleKind::Guide, None),
        rule("block-1", "homework", RuleKind::Block, None),
    ]);
    let result = engine.evaluate("do my homework", 1).await;
    assert_eq!(result.action, RuleAction::Blocked);
    assert_eq!(result.rule_id.as_deref(), Some("block-1"));
}

#[tokio::test]
async fn disabled_rules_are_skipped() {
    let mut disabled = rule("r1", "homework", RuleKind::Block, None);
    disabled.enabled = false;
    let (engine, _source) = sourced_engine(vec![disabled]);
    let result = engine.evaluate("do my homework", 1).await;
    assert_eq!(result.action, RuleAction::Passed);
}

#[tokio::test]
async fn matching_is_case_insensitive_via_folding() {
    let (engine, _source) = sourced_engine(vec![rule("r1", "homework", RuleKind::Block, None)]);
    let result = engine.evaluate("Do My HOMEWORK", 1).await;
    assert_eq!(result.action, RuleAction::Blocked);
}

#[tokio::test]
async fn invalid_pattern_skips_only_that_rule() {
    let (engine, _source) = sourced_engine(vec![
        rule("bad", "([unclosed", RuleKind::Block, None),
        rule("good", "homework", RuleKind::Block, None),
    ]);
    let result = engine.evaluate("do my homework", 1).await;
    assert_eq!(result.action, RuleAction::Blocked);
    assert_eq!(result.rule_id.as_deref(), Some("good"));
}

#[tokio::test]
async fn stored_rules_preempt_fallback_tables() {
    // One unrelated stored rule is enough to retire the fallback policy.
    let (engine, _source) = sourced_engine(vec![rule("r1", "zzz", RuleKind::Block, None)]);
    let result = engine.evaluate("帮我实现一个爬虫程序", 1).await;
    assert_eq!(result.action, RuleAction::Passed);
}

#[tokio::test]
async fn rule_set_is_cached_across_evaluations() {
    let (engine, source) = sourced_engine(vec![rule("r1", "homework", RuleKind::Block, None)]);
    engine.evaluate("first", 1).await;
    engine.evaluate("second", 1).await;
    assert_eq!(source.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reload_forces_the_next_evaluation_to_consult_the_source() {
    let (engine, source) = sourced_engine(vec![rule("r1", "homework", RuleKind::Block, None)]);
    engine.evaluate("first", 1).await;
    engine.reload();
    engine.evaluate("second", 1).await;
    assert_eq!(source.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn source_failure_degrades_to_the_fallback_tables() {
    let metrics = Arc::new(MetricsAggregator::new());
    let engine = RuleEngine::new(
        Some(Arc::new(BrokenSource) as Arc<dyn RuleSource>),
        Arc::clone(&metrics),
        DEFAULT_RULE_CACHE_TTL,
        DEFAULT_MATCH_TIMEOUT,
    );
    let result = engine.evaluate("帮我实现一个爬虫程序", 1).await;
    assert_eq!(result.action, RuleAction::Blocked);
    assert_eq!(metrics.summary().errors_by_type["rule_source_unavailable"], 1);
}

/// Runtime with a single blocking worker, so occupying that worker stalls
/// every pattern match deterministically.
fn single_blocking_worker_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .max_blocking_threads(1)
        .build()
        .unwrap()
}

/// Occupies the sole blocking worker for `hold`, after yielding long enough
/// for the worker to pick the job up.
async fn occupy_blocking_worker(hold: Duration) -> tokio::task::JoinHandle<()> {
    let blocker = tokio::task::spawn_blocking(move || std::thread::sleep(hold));
    tokio::time::sleep(Duration::from_millis(20)).await;
    blocker
}

#[test]
fn overrun_match_degrades_to_no_match_and_is_counted() {
    let runtime = single_blocking_worker_runtime();
    runtime.block_on(async {
        let metrics = Arc::new(MetricsAggregator::new());
        let source = Arc::new(FixedSource {
            rules: vec![rule("only", "homework", RuleKind::Block, None)],
            loads: AtomicU64::new(0),
        });
        let engine = RuleEngine::new(
            Some(source as Arc<dyn RuleSource>),
            Arc::clone(&metrics),
            DEFAULT_RULE_CACHE_TTL,
            Duration::from_millis(100),
        );
        let _blocker = occupy_blocking_worker(Duration::from_millis(400)).await;
        // The match never starts before its deadline, so the rule degrades
        // to no-match and the request completes.
        let result = engine.evaluate("do my homework", 1).await;
        assert_eq!(result.action, RuleAction::Passed);
        assert_eq!(metrics.summary().errors_by_type["rule_match_timeout"], 1);
    });
}

#[test]
fn a_timed_out_rule_does_not_stop_later_rules() {
    let runtime = single_blocking_worker_runtime();
    runtime.block_on(async {
        let metrics = Arc::new(MetricsAggregator::new());
        let source = Arc::new(FixedSource {
            rules: vec![
                rule("stalled", "unrelated pattern", RuleKind::Block, None),
                rule("matching", "homework", RuleKind::Block, None),
            ],
            loads: AtomicU64::new(0),
        });
        let engine = RuleEngine::new(
            Some(source as Arc<dyn RuleSource>),
            Arc::clone(&metrics),
            DEFAULT_RULE_CACHE_TTL,
            Duration::from_millis(500),
        );
        // The first rule's deadline elapses while the worker is held; the
        // worker frees before the second rule's deadline, so the second
        // rule still evaluates and matches.
        let _blocker = occupy_blocking_worker(Duration::from_millis(800)).await;
        let result = engine.evaluate("do my homework", 1).await;
        assert_eq!(result.action, RuleAction::Blocked);
        assert_eq!(result.rule_id.as_deref(), Some("matching"));
        assert_eq!(metrics.summary().errors_by_type["rule_match_timeout"], 1);
    });
}
