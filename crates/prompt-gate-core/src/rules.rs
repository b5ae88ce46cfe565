// crates/prompt-gate-core/src/rules.rs
// ============================================================================
// Module: Moderation Rule Model
// Description: Rule records, evaluation results, and fallback pattern tables.
// Purpose: Provide the data model consumed by the gateway rule engine.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Rule`] matches untrusted prompt text against a stored regular
//! expression and is scoped to an academic week range. Rules come in two
//! kinds evaluated in two phases: `block` rules reject the prompt outright,
//! `guide` rules substitute a coaching message. Rules are read-only from the
//! engine's perspective; the administrative collaborator owns mutation.
//!
//! ## Invariants
//! - [`RuleResult`] values are produced fresh per evaluation and never
//!   mutated afterward.
//! - The hardcoded fallback tables in [`patterns`] are fixed at compile
//!   time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

pub mod patterns;

// ============================================================================
// SECTION: Rule Records
// ============================================================================

/// Rule evaluation phase.
///
/// # Invariants
/// - Variants are stable for serialization and store round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Matching prompts are rejected with the rule message.
    Block,
    /// Matching prompts receive the rule message as coaching.
    Guide,
}

/// A moderation rule sourced from the rule store.
///
/// # Invariants
/// - `pattern` is stored as text; compilation happens in the engine and a
///   failing pattern skips only this rule.
/// - `active_weeks` parses through [`crate::week::WeekRange::parse`], so
///   malformed text widens to always-active rather than disabling the rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Stable rule identifier.
    pub id: String,
    /// Regular expression text matched against the prompt.
    pub pattern: String,
    /// Evaluation phase this rule belongs to.
    pub kind: RuleKind,
    /// Message returned to the caller when the rule matches.
    pub message: String,
    /// Week-range text scoping activation, e.g. `"1-16"`.
    pub active_weeks: Option<String>,
    /// Disabled rules are skipped without evaluation.
    pub enabled: bool,
}

// ============================================================================
// SECTION: Evaluation Results
// ============================================================================

/// Outcome category of a rule evaluation.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// A block rule matched; the prompt must not reach the upstream.
    Blocked,
    /// A guide rule matched; the rule message replaces the completion.
    Guided,
    /// No active rule matched.
    Passed,
}

/// Result of evaluating one prompt against the active rule set.
///
/// # Invariants
/// - `message` and `rule_id` are populated exactly when `action` is not
///   [`RuleAction::Passed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Outcome category.
    pub action: RuleAction,
    /// Message from the matching rule, when any matched.
    pub message: Option<String>,
    /// Identifier of the matching rule, when any matched.
    pub rule_id: Option<String>,
}

impl RuleResult {
    /// Builds a blocked result for the given rule.
    #[must_use]
    pub fn blocked(message: impl Into<String>, rule_id: impl Into<String>) -> Self {
        Self {
            action: RuleAction::Blocked,
            message: Some(message.into()),
            rule_id: Some(rule_id.into()),
        }
    }

    /// Builds a guided result for the given rule.
    #[must_use]
    pub fn guided(message: impl Into<String>, rule_id: impl Into<String>) -> Self {
        Self {
            action: RuleAction::Guided,
            message: Some(message.into()),
            rule_id: Some(rule_id.into()),
        }
    }

    /// Builds a passed result.
    #[must_use]
    pub const fn passed() -> Self {
        Self {
            action: RuleAction::Passed,
            message: None,
            rule_id: None,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
