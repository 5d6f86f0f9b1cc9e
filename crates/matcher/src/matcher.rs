//! The pattern matcher — length-capped, time-ceilinged rule evaluation.
//!
//! Defends against inputs crafted to stall matching: the message is
//! truncated to a fixed cap before any rule runs, and every individual
//! rule evaluation is timed. A rule whose evaluation exceeded the ceiling
//! is treated as non-matching (even if it matched) and counted, so the
//! caller can observe pathological rules without ever seeing an error.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::rule::CategoryRuleSet;

/// Outcome of evaluating one rule set against one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Whether any rule matched within its ceiling.
    pub matched: bool,
    /// Number of rules that exceeded their time ceiling.
    pub timed_out: usize,
}

/// Evaluates rule sets against a prepared message.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    max_message_chars: usize,
    rule_ceiling: Duration,
}

impl PatternMatcher {
    pub fn new(max_message_chars: usize, rule_ceiling: Duration) -> Self {
        Self {
            max_message_chars,
            rule_ceiling,
        }
    }

    /// Lowercase and truncate a message for matching.
    ///
    /// Truncation happens on a char boundary so multi-byte input can never
    /// panic the slice. Oversized input is a recoverable condition, not an
    /// error: the tail simply does not participate in matching.
    pub fn prepare(&self, text: &str) -> String {
        let capped = match text.char_indices().nth(self.max_message_chars) {
            Some((byte_idx, _)) => &text[..byte_idx],
            None => text,
        };
        capped.to_lowercase()
    }

    /// Evaluate a rule set against an already-prepared message.
    ///
    /// Short-circuits on the first in-budget match. A match produced by a
    /// rule that blew its ceiling is discarded, not trusted.
    pub fn match_rule_set(&self, rules: &CategoryRuleSet, prepared: &str) -> MatchOutcome {
        let mut timed_out = 0;

        for rule in rules.rules() {
            let started = Instant::now();
            let hit = rule.is_match(prepared);
            if started.elapsed() >= self.rule_ceiling {
                timed_out += 1;
                debug!(
                    category = %rules.category(),
                    rule = rule.label(),
                    ceiling_ms = self.rule_ceiling.as_millis() as u64,
                    "pattern rule exceeded its time ceiling, treated as non-match"
                );
                continue;
            }
            if hit {
                return MatchOutcome {
                    matched: true,
                    timed_out,
                };
            }
        }

        MatchOutcome {
            matched: false,
            timed_out,
        }
    }

    pub fn max_message_chars(&self) -> usize {
        self.max_message_chars
    }

    pub fn rule_ceiling(&self) -> Duration {
        self.rule_ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::PatternRule;
    use toolgate_core::Category;

    fn matcher() -> PatternMatcher {
        PatternMatcher::new(4_000, Duration::from_millis(25))
    }

    fn trip_rules() -> CategoryRuleSet {
        CategoryRuleSet::new(
            Category::Trip,
            vec![
                PatternRule::keyword("flight").unwrap(),
                PatternRule::keyword("hotel").unwrap(),
            ],
        )
    }

    #[test]
    fn prepare_lowercases() {
        assert_eq!(matcher().prepare("Show My EXPENSES"), "show my expenses");
    }

    #[test]
    fn prepare_truncates_on_char_boundary() {
        let m = PatternMatcher::new(3, Duration::from_millis(25));
        assert_eq!(m.prepare("héllo"), "hél");
        assert_eq!(m.prepare("ab"), "ab");
    }

    #[test]
    fn matches_within_ceiling() {
        let m = matcher();
        let outcome = m.match_rule_set(&trip_rules(), &m.prepare("Book a FLIGHT to Osaka"));
        assert!(outcome.matched);
        assert_eq!(outcome.timed_out, 0);
    }

    #[test]
    fn no_match_reports_clean_outcome() {
        let m = matcher();
        let outcome = m.match_rule_set(&trip_rules(), &m.prepare("what time is it"));
        assert!(!outcome.matched);
        assert_eq!(outcome.timed_out, 0);
    }

    #[test]
    fn zero_ceiling_discards_matches_and_counts_timeouts() {
        // A zero ceiling makes every rule "too slow" — the matched verdict
        // must be discarded and every evaluated rule counted.
        let m = PatternMatcher::new(4_000, Duration::ZERO);
        let outcome = m.match_rule_set(&trip_rules(), "book a flight and a hotel");
        assert!(!outcome.matched);
        assert_eq!(outcome.timed_out, 2);
    }

    #[test]
    fn truncation_hides_keywords_past_the_cap() {
        let m = PatternMatcher::new(10, Duration::from_millis(25));
        let text = "aaaaaaaaaa flight";
        let outcome = m.match_rule_set(&trip_rules(), &m.prepare(text));
        assert!(!outcome.matched);
    }

    #[test]
    fn pathological_input_returns_quickly() {
        // Repetitive input of the shape that stalls backtracking engines.
        // Both rule kinds here are linear-time over a capped message, so
        // the whole evaluation must finish far inside a second.
        let m = matcher();
        let rules = CategoryRuleSet::new(
            Category::Search,
            vec![PatternRule::regex(r"(a+)+b").unwrap()],
        );
        let text = "a".repeat(100_000);

        let started = Instant::now();
        let prepared = m.prepare(&text);
        let outcome = m.match_rule_set(&rules, &prepared);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!outcome.matched);
        assert_eq!(prepared.len(), 4_000);
    }

    #[test]
    fn empty_rule_set_never_matches() {
        let m = matcher();
        let rules = CategoryRuleSet::new(Category::System, vec![]);
        let outcome = m.match_rule_set(&rules, "anything");
        assert!(!outcome.matched);
        assert_eq!(outcome.timed_out, 0);
    }
}
