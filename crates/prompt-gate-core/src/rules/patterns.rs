// crates/prompt-gate-core/src/rules/patterns.rs
// ============================================================================
// Module: Hardcoded Fallback Patterns
// Description: Fixed block/guide pattern tables used when no store rules load.
// Purpose: Preserve the legacy coursework policy as a deterministic fallback.
// Dependencies: none
// ============================================================================

//! ## Overview
//! When the rule store is unavailable or returns no rules, the engine falls
//! back to these fixed tables. The block table is additionally restricted to
//! weeks at or below [`HARDCODED_BLOCK_MAX_WEEK`] — a narrower legacy window
//! than store-sourced rules, which carry their own explicit week ranges.
//! The asymmetry is deliberate and preserved.

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Last week (inclusive) during which fallback block patterns apply.
pub const HARDCODED_BLOCK_MAX_WEEK: u32 = 2;

/// Identifier prefix for results matched by a fallback pattern.
pub const HARDCODED_RULE_ID_PREFIX: &str = "hardcoded:";

/// Message returned when a fallback pattern detects a direct code request.
const BLOCK_CODE_MESSAGE: &str = "检测到你在直接要求代码。根据课程要求，请先尝试：\n1. 描述你想解决什么问题\n2. 说明你已经尝试了什么\n3. 具体哪里卡住了\n\n请重新组织你的问题 :)";

/// Message returned when a fallback pattern detects a direct answer request.
const BLOCK_ANSWER_MESSAGE: &str = "检测到你在直接要求答案。根据课程要求，请先尝试：\n1. 描述你想解决什么问题\n2. 说明你已经尝试了什么\n3. 具体哪里卡住了\n\n请重新组织你的问题 :)";

/// Message returned when a fallback pattern detects a do-my-homework request.
const BLOCK_HOMEWORK_MESSAGE: &str = "检测到你在直接要求代做作业。根据课程要求，请先尝试：\n1. 描述你想解决什么问题\n2. 说明你已经尝试了什么\n3. 具体哪里卡住了\n\n请重新组织你的问题 :)";

// ============================================================================
// SECTION: Pattern Tables
// ============================================================================

/// Fallback block patterns, checked in order during weeks at or below
/// [`HARDCODED_BLOCK_MAX_WEEK`].
pub const BLOCK_PATTERNS: [(&str, &str); 6] = [
    ("写一个.+程序", BLOCK_CODE_MESSAGE),
    ("帮我实现.+", BLOCK_CODE_MESSAGE),
    ("生成.+代码", BLOCK_CODE_MESSAGE),
    ("给我.+的代码", BLOCK_CODE_MESSAGE),
    ("这道题的答案是什么", BLOCK_ANSWER_MESSAGE),
    ("帮我做.+作业", BLOCK_HOMEWORK_MESSAGE),
];

/// Fallback guide patterns, always active, checked after block patterns.
pub const GUIDE_PATTERNS: [(&str, &str); 2] = [
    ("怎么.{2,5}$", "你的问题比较简短，能否补充更多背景？"),
    ("解释.+", "在我解释之后，请尝试用自己的话复述一遍"),
];
