// crates/prompt-gate-gateway/src/engine.rs
// ============================================================================
// Module: Rule Engine
// Description: Two-phase prompt moderation over cached, compiled rules.
// Purpose: Decide block/guide/pass before any upstream call is made.
// Dependencies: async-trait, prompt-gate-core, regex, thiserror, tokio
// ============================================================================

//! ## Overview
//! The engine loads moderation rules through the [`RuleSource`] seam, caches
//! the compiled set under a single key, and evaluates prompts in two phases:
//! block rules first, guide rules second, each in stored order. When the
//! source is absent, fails, or returns no rules, a fixed fallback table keeps
//! the legacy coursework policy in force.
//!
//! Every pattern match runs on a blocking worker under a deadline. The regex
//! engine itself is linear-time, but stored patterns are operator input and
//! prompts are untrusted, so a match that overruns the deadline degrades to
//! no-match for that rule rather than stalling the request.
//!
//! ## Invariants
//! - Block rules are exhausted before any guide rule is considered.
//! - A rule that fails to compile is skipped; later rules still evaluate.
//! - Fallback block patterns apply only during weeks at or below
//!   [`patterns::HARDCODED_BLOCK_MAX_WEEK`]; fallback guide patterns always.
//!
//! ## Security posture
//! Prompt text is untrusted and is only ever matched, never interpolated
//! into patterns or identifiers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use prompt_gate_core::Rule;
use prompt_gate_core::RuleKind;
use prompt_gate_core::RuleResult;
use prompt_gate_core::WeekRange;
use prompt_gate_core::rules::patterns;

use crate::cache::TtlCache;
use crate::metrics::MetricsAggregator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Cache key under which the full compiled rule set is stored.
const RULE_CACHE_KEY: &str = "rules:all";

/// Default TTL for the compiled rule cache.
pub const DEFAULT_RULE_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default deadline for a single pattern match.
pub const DEFAULT_MATCH_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// SECTION: Rule Source Seam
// ============================================================================

/// Errors emitted by rule source implementations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleSourceError {
    /// The backing rule store could not be reached or queried.
    #[error("rule source unavailable: {0}")]
    Unavailable(String),
}

/// Read-only seam over the external rule store.
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Loads the full rule set in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`RuleSourceError`] when the store cannot be queried.
    async fn load_rules(&self) -> Result<Vec<Rule>, RuleSourceError>;
}

// ============================================================================
// SECTION: Compiled Rules
// ============================================================================

/// A loaded rule set with patterns compiled once per load.
#[derive(Debug)]
struct CompiledRules {
    /// Rules in stored order.
    rules: Vec<Rule>,
    /// Compiled patterns keyed by rule id; rules absent here failed to
    /// compile and are skipped.
    compiled: HashMap<String, Arc<Regex>>,
}

/// A fallback pattern compiled at engine construction.
#[derive(Debug)]
struct FallbackPattern {
    /// Compiled pattern.
    regex: Arc<Regex>,
    /// Original pattern text, used to derive the result rule id.
    pattern: &'static str,
    /// Message returned on match.
    message: &'static str,
}

// ============================================================================
// SECTION: Rule Engine
// ============================================================================

/// Two-phase prompt moderation engine with a TTL-bounded rule cache.
pub struct RuleEngine {
    /// External rule source; `None` runs on the fallback tables alone.
    source: Option<Arc<dyn RuleSource>>,
    /// Compiled rule set cache keyed by [`RULE_CACHE_KEY`].
    cache: TtlCache<String, Arc<CompiledRules>>,
    /// Fallback block patterns, in table order.
    fallback_block: Vec<FallbackPattern>,
    /// Fallback guide patterns, in table order.
    fallback_guide: Vec<FallbackPattern>,
    /// Deadline for a single pattern match.
    match_timeout: Duration,
    /// Sink for skip and timeout counters.
    metrics: Arc<MetricsAggregator>,
}

impl RuleEngine {
    /// Creates an engine over `source` with the given cache TTL and match
    /// deadline. Fallback tables are compiled here, once.
    #[must_use]
    pub fn new(
        source: Option<Arc<dyn RuleSource>>,
        metrics: Arc<MetricsAggregator>,
        cache_ttl: Duration,
        match_timeout: Duration,
    ) -> Self {
        Self {
            source,
            cache: TtlCache::new(cache_ttl, 4),
            fallback_block: compile_fallback(&patterns::BLOCK_PATTERNS),
            fallback_guide: compile_fallback(&patterns::GUIDE_PATTERNS),
            match_timeout,
            metrics,
        }
    }

    /// Evaluates `prompt` against the active rule set for `week`.
    ///
    /// The prompt is case-folded once; block rules run first, then guide
    /// rules, each in stored order. Disabled rules and rules outside their
    /// week range are skipped. When no stored rules are available the
    /// fallback tables apply instead.
    pub async fn evaluate(&self, prompt: &str, week: u32) -> RuleResult {
        let normalized = prompt.to_lowercase();
        let rules = self.load().await;
        if rules.rules.is_empty() {
            return self.evaluate_fallback(&normalized, week).await;
        }
        if let Some(result) = self.evaluate_phase(&rules, RuleKind::Block, &normalized, week).await
        {
            return result;
        }
        if let Some(result) = self.evaluate_phase(&rules, RuleKind::Guide, &normalized, week).await
        {
            return result;
        }
        RuleResult::passed()
    }

    /// Invalidates the cached rule set so the next evaluation reloads.
    pub fn reload(&self) {
        self.cache.invalidate(&RULE_CACHE_KEY.to_string());
    }

    /// Runs one phase over the stored rules, returning the first match.
    async fn evaluate_phase(
        &self,
        rules: &CompiledRules,
        kind: RuleKind,
        normalized: &str,
        week: u32,
    ) -> Option<RuleResult> {
        for rule in rules.rules.iter().filter(|r| r.kind == kind) {
            if !rule.enabled {
                continue;
            }
            if !WeekRange::parse(rule.active_weeks.as_deref()).contains(week) {
                continue;
            }
            let Some(regex) = rules.compiled.get(&rule.id) else {
                continue;
            };
            if self.is_match(regex, normalized).await {
                return Some(match kind {
                    RuleKind::Block => RuleResult::blocked(rule.message.clone(), rule.id.clone()),
                    RuleKind::Guide => RuleResult::guided(rule.message.clone(), rule.id.clone()),
                });
            }
        }
        None
    }

    /// Evaluates the fallback tables: block patterns only during the early
    /// legacy window, guide patterns in every week.
    async fn evaluate_fallback(&self, normalized: &str, week: u32) -> RuleResult {
        if week <= patterns::HARDCODED_BLOCK_MAX_WEEK {
            for entry in &self.fallback_block {
                if self.is_match(&entry.regex, normalized).await {
                    return RuleResult::blocked(entry.message, fallback_rule_id(entry.pattern));
                }
            }
        }
        for entry in &self.fallback_guide {
            if self.is_match(&entry.regex, normalized).await {
                return RuleResult::guided(entry.message, fallback_rule_id(entry.pattern));
            }
        }
        RuleResult::passed()
    }

    /// Returns the cached rule set, loading and compiling on miss.
    ///
    /// A source failure counts an error and yields an empty set without
    /// caching it, so the fallback tables apply until the source recovers.
    async fn load(&self) -> Arc<CompiledRules> {
        let key = RULE_CACHE_KEY.to_string();
        if let Some(rules) = self.cache.get(&key) {
            return rules;
        }
        let Some(source) = &self.source else {
            return Arc::new(self.compile(Vec::new()));
        };
        match source.load_rules().await {
            Ok(rules) => {
                let compiled = Arc::new(self.compile(rules));
                self.cache.insert(key, Arc::clone(&compiled));
                compiled
            }
            Err(_) => {
                self.metrics.record_error("rule_source_unavailable");
                Arc::new(self.compile(Vec::new()))
            }
        }
    }

    /// Compiles patterns for a loaded rule set, skipping failures.
    fn compile(&self, rules: Vec<Rule>) -> CompiledRules {
        let mut compiled = HashMap::with_capacity(rules.len());
        for rule in &rules {
            match Regex::new(&rule.pattern) {
                Ok(regex) => {
                    compiled.insert(rule.id.clone(), Arc::new(regex));
                }
                Err(_) => {
                    self.metrics.record_error("invalid_rule_pattern");
                }
            }
        }
        CompiledRules { rules, compiled }
    }

    /// Runs one pattern match on a blocking worker under the deadline.
    ///
    /// A deadline overrun or worker failure degrades to no-match for this
    /// rule and counts a timeout error.
    async fn is_match(&self, regex: &Arc<Regex>, text: &str) -> bool {
        let regex = Arc::clone(regex);
        let text = text.to_string();
        let task = tokio::task::spawn_blocking(move || regex.is_match(&text));
        match tokio::time::timeout(self.match_timeout, task).await {
            Ok(Ok(matched)) => matched,
            Ok(Err(_)) | Err(_) => {
                self.metrics.record_error("rule_match_timeout");
                false
            }
        }
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("match_timeout", &self.match_timeout)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Derives the result rule id for a fallback pattern.
fn fallback_rule_id(pattern: &str) -> String {
    format!("{}{pattern}", patterns::HARDCODED_RULE_ID_PREFIX)
}

/// Compiles a fallback pattern table, skipping entries that fail.
///
/// The tables are fixed at compile time so failures do not occur in
/// practice; skipping keeps construction total.
fn compile_fallback(table: &[(&'static str, &'static str)]) -> Vec<FallbackPattern> {
    table
        .iter()
        .filter_map(|&(pattern, message)| {
            Regex::new(pattern).ok().map(|regex| FallbackPattern {
                regex: Arc::new(regex),
                pattern,
                message,
            })
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
