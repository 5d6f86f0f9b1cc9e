//! Pattern rules — the match primitives category detection runs.
//!
//! Two kinds: keyword rules (case-insensitive substring scan, the common
//! case) and regex rules (compiled once at load with a size limit).
//! Compilation failures surface at load time; a compiled rule cannot fail
//! at match time.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use toolgate_core::Category;

/// Regex compile-time size cap. A rule that blows past this is a config
/// mistake, not something to discover per request.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },

    #[error("Empty pattern")]
    EmptyPattern,
}

enum PatternKind {
    /// Lowercased needle, matched by substring scan against the prepared
    /// (lowercased) message.
    Keyword(String),
    /// Case-insensitive compiled regex.
    Regex(Box<Regex>),
}

/// A single compiled pattern rule.
pub struct PatternRule {
    /// The original pattern text, kept for logging.
    label: String,
    kind: PatternKind,
}

impl PatternRule {
    /// A case-insensitive substring rule.
    pub fn keyword(word: impl Into<String>) -> Result<Self, RuleError> {
        let word = word.into();
        if word.trim().is_empty() {
            return Err(RuleError::EmptyPattern);
        }
        Ok(Self {
            kind: PatternKind::Keyword(word.to_lowercase()),
            label: word,
        })
    }

    /// A regex rule, compiled case-insensitive with a size limit.
    pub fn regex(pattern: impl Into<String>) -> Result<Self, RuleError> {
        let pattern = pattern.into();
        if pattern.trim().is_empty() {
            return Err(RuleError::EmptyPattern);
        }
        let compiled = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|source| RuleError::InvalidRegex {
                pattern: pattern.clone(),
                source,
            })?;
        Ok(Self {
            kind: PatternKind::Regex(Box::new(compiled)),
            label: pattern,
        })
    }

    /// The original pattern text.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Evaluate against a prepared (lowercased, length-capped) message.
    pub(crate) fn is_match(&self, prepared: &str) -> bool {
        match &self.kind {
            PatternKind::Keyword(needle) => prepared.contains(needle.as_str()),
            PatternKind::Regex(re) => re.is_match(prepared),
        }
    }
}

impl std::fmt::Debug for PatternRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            PatternKind::Keyword(_) => "keyword",
            PatternKind::Regex(_) => "regex",
        };
        f.debug_struct("PatternRule")
            .field("kind", &kind)
            .field("pattern", &self.label)
            .finish()
    }
}

/// The ordered pattern rules for one category.
#[derive(Debug)]
pub struct CategoryRuleSet {
    category: Category,
    rules: Vec<PatternRule>,
}

impl CategoryRuleSet {
    pub fn new(category: Category, rules: Vec<PatternRule>) -> Self {
        Self { category, rules }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
