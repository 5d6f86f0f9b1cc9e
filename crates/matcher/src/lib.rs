//! Pattern rules, bounded matching, and category detection.
//!
//! This crate answers one question per turn: *which tool categories does
//! this message (and the page the user is on) point at?* Matching is
//! deliberately cheap and deterministic — substring and linear-time regex
//! scans over a length-capped message — and every rule evaluation is held
//! to a time ceiling so a pathological rule can degrade only itself, never
//! the call.

pub mod detector;
pub mod matcher;
pub mod rule;

pub use detector::{CategoryDetector, Detect, Detection, PageCategoryMap};
pub use matcher::{MatchOutcome, PatternMatcher};
pub use rule::{CategoryRuleSet, PatternRule, RuleError};
