// crates/prompt-gate-core/src/week.rs
// ============================================================================
// Module: Academic Week Ranges
// Description: Inclusive week intervals scoping rule activation.
// Purpose: Parse stored week-range text and test week membership.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Rules are scoped to an inclusive `[start, end]` academic-week interval
//! stored as free text (`"1-16"`, `"3"`, or `"1,3,5"`). Parsing is total:
//! anything unparsable falls back to the always-active range so a malformed
//! row can widen but never silently disable a rule.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// First week of the always-active fallback range.
const FALLBACK_START: u32 = 1;
/// Last week of the always-active fallback range.
const FALLBACK_END: u32 = 99;

// ============================================================================
// SECTION: Week Range
// ============================================================================

/// Inclusive academic-week interval.
///
/// # Invariants
/// - `start <= end` for every constructed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRange {
    /// First active week (inclusive).
    pub start: u32,
    /// Last active week (inclusive).
    pub end: u32,
}

impl WeekRange {
    /// The always-active fallback range, week 1 through 99.
    pub const ALWAYS: Self = Self {
        start: FALLBACK_START,
        end: FALLBACK_END,
    };

    /// Parses stored week-range text.
    ///
    /// Accepted forms, after trimming: `"a-b"`, a comma list reduced to its
    /// min/max, or a single week. `None`, empty, or unparsable input returns
    /// [`WeekRange::ALWAYS`]; parsing never fails.
    #[must_use]
    pub fn parse(text: Option<&str>) -> Self {
        let Some(raw) = text else {
            return Self::ALWAYS;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::ALWAYS;
        }
        parse_trimmed(trimmed).unwrap_or(Self::ALWAYS)
    }

    /// Returns true when `week` falls inside the interval, boundaries
    /// included.
    #[must_use]
    pub const fn contains(&self, week: u32) -> bool {
        self.start <= week && week <= self.end
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses trimmed, non-empty week-range text; `None` means fall back.
fn parse_trimmed(text: &str) -> Option<WeekRange> {
    if let Some((start_text, end_text)) = text.split_once('-') {
        let start = start_text.trim().parse().ok()?;
        let end = end_text.trim().parse().ok()?;
        if start > end {
            return None;
        }
        return Some(WeekRange { start, end });
    }
    if text.contains(',') {
        let mut weeks = Vec::new();
        for part in text.split(',') {
            weeks.push(part.trim().parse::<u32>().ok()?);
        }
        let start = *weeks.iter().min()?;
        let end = *weeks.iter().max()?;
        return Some(WeekRange { start, end });
    }
    let week = text.parse().ok()?;
    Some(WeekRange {
        start: week,
        end: week,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
