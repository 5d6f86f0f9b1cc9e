//! Category detection — keyword rules unioned with the page-context signal.
//!
//! The page the user is on is a stronger, free signal than free-text
//! keyword guessing, so the two are kept separate in the output: the
//! selector stages page-signal tools ahead of keyword-signal tools.

use std::collections::{BTreeSet, HashMap};

use toolgate_core::{Category, Result};

use crate::matcher::PatternMatcher;
use crate::rule::CategoryRuleSet;

/// Immutable page identifier → category map, loaded once.
#[derive(Debug, Default)]
pub struct PageCategoryMap {
    entries: HashMap<String, Category>,
}

impl PageCategoryMap {
    pub fn new(entries: HashMap<String, Category>) -> Self {
        Self { entries }
    }

    /// Category for a page identifier, if mapped.
    pub fn lookup(&self, page: &str) -> Option<Category> {
        self.entries.get(page).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Category)> for PageCategoryMap {
    fn from_iter<I: IntoIterator<Item = (String, Category)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// What one turn's detection produced.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Category implied by the page the user is on, if any.
    pub page_category: Option<Category>,

    /// Categories whose keyword rules matched the message.
    pub keyword_categories: BTreeSet<Category>,

    /// Rules that exceeded their time ceiling while detecting.
    pub timed_out_rules: usize,
}

impl Detection {
    /// All matched categories — page and keyword signals combined,
    /// deduplicated, in stable category order.
    pub fn categories(&self) -> BTreeSet<Category> {
        let mut all = self.keyword_categories.clone();
        if let Some(page) = self.page_category {
            all.insert(page);
        }
        all
    }

    /// True when nothing matched and the page is unmapped — a valid,
    /// common case, not an error.
    pub fn is_empty(&self) -> bool {
        self.page_category.is_none() && self.keyword_categories.is_empty()
    }
}

/// The detection seam the facade calls through.
///
/// Production uses [`CategoryDetector`]; tests substitute failing or
/// panicking implementations to exercise the facade's fallback boundary.
pub trait Detect: Send + Sync {
    fn detect(&self, message: &str, current_page: Option<&str>) -> Result<Detection>;
}

/// Runs the pattern matcher across all category rule sets and merges in
/// the page-context signal.
#[derive(Debug)]
pub struct CategoryDetector {
    rule_sets: Vec<CategoryRuleSet>,
    pages: PageCategoryMap,
    matcher: PatternMatcher,
}

impl CategoryDetector {
    pub fn new(
        rule_sets: Vec<CategoryRuleSet>,
        pages: PageCategoryMap,
        matcher: PatternMatcher,
    ) -> Self {
        Self {
            rule_sets,
            pages,
            matcher,
        }
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }
}

impl Detect for CategoryDetector {
    fn detect(&self, message: &str, current_page: Option<&str>) -> Result<Detection> {
        let prepared = self.matcher.prepare(message);

        let mut keyword_categories = BTreeSet::new();
        let mut timed_out_rules = 0;
        for set in &self.rule_sets {
            let outcome = self.matcher.match_rule_set(set, &prepared);
            timed_out_rules += outcome.timed_out;
            if outcome.matched {
                keyword_categories.insert(set.category());
            }
        }

        // Page context is honored unconditionally, independent of keywords.
        let page_category = current_page.and_then(|p| self.pages.lookup(p));

        Ok(Detection {
            page_category,
            keyword_categories,
            timed_out_rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::PatternRule;
    use std::time::Duration;

    fn detector() -> CategoryDetector {
        let rule_sets = vec![
            CategoryRuleSet::new(
                Category::Financial,
                vec![
                    PatternRule::keyword("expense").unwrap(),
                    PatternRule::keyword("budget").unwrap(),
                ],
            ),
            CategoryRuleSet::new(
                Category::Trip,
                vec![PatternRule::keyword("flight").unwrap()],
            ),
        ];
        let pages = PageCategoryMap::from_iter([
            ("expenses".to_string(), Category::Financial),
            ("trips".to_string(), Category::Trip),
        ]);
        CategoryDetector::new(
            rule_sets,
            pages,
            PatternMatcher::new(4_000, Duration::from_millis(25)),
        )
    }

    #[test]
    fn keyword_match_detects_category() {
        let detection = detector()
            .detect("show my expenses for March", None)
            .unwrap();
        assert!(detection.keyword_categories.contains(&Category::Financial));
        assert!(detection.page_category.is_none());
    }

    #[test]
    fn multiple_categories_union() {
        let detection = detector()
            .detect("expense a flight to Osaka", None)
            .unwrap();
        let all = detection.categories();
        assert!(all.contains(&Category::Financial));
        assert!(all.contains(&Category::Trip));
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn page_signal_added_unconditionally() {
        let detection = detector().detect("hello there", Some("trips")).unwrap();
        assert_eq!(detection.page_category, Some(Category::Trip));
        assert!(detection.keyword_categories.is_empty());
        assert!(!detection.is_empty());
    }

    #[test]
    fn page_and_keyword_dedupe_in_union() {
        let detection = detector()
            .detect("expense report", Some("expenses"))
            .unwrap();
        assert_eq!(detection.page_category, Some(Category::Financial));
        assert!(detection.keyword_categories.contains(&Category::Financial));
        assert_eq!(detection.categories().len(), 1);
    }

    #[test]
    fn unmapped_page_and_no_keywords_is_empty_not_error() {
        let detection = detector()
            .detect("what should I have for lunch", Some("unknown-page"))
            .unwrap();
        assert!(detection.is_empty());
        assert!(detection.categories().is_empty());
    }

    #[test]
    fn timed_out_rules_accumulate_across_sets() {
        let rule_sets = vec![
            CategoryRuleSet::new(
                Category::Financial,
                vec![PatternRule::keyword("expense").unwrap()],
            ),
            CategoryRuleSet::new(
                Category::Trip,
                vec![PatternRule::keyword("flight").unwrap()],
            ),
        ];
        let det = CategoryDetector::new(
            rule_sets,
            PageCategoryMap::default(),
            PatternMatcher::new(4_000, Duration::ZERO),
        );
        let detection = det.detect("expense a flight", None).unwrap();
        assert!(detection.keyword_categories.is_empty());
        assert_eq!(detection.timed_out_rules, 2);
    }
}
