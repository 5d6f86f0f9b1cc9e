//! Stage-ordered tool selection.
//!
//! Strict priority order, each stage deduplicating against what is already
//! selected:
//!
//! 1. every always-include tool;
//! 2. tools of the page-signal category;
//! 3. tools of keyword-matched categories;
//! 4. recently used tools, most-recent first.
//!
//! The cap applies across stages: once the limit is reached nothing further
//! is admitted. A stage can be partially admitted; the cut point is
//! deterministic because category stages walk tools in the snapshot's name
//! order and the recency stage walks most-recent-first.

use std::collections::HashSet;

use toolgate_core::RegistrySnapshot;
use toolgate_matcher::Detection;

/// Select up to `max_tools` tool names for one turn.
///
/// `recent` is most-recent-first; names unknown to the snapshot are
/// skipped (they may refer to tools removed by a snapshot swap).
pub fn select(
    registry: &RegistrySnapshot,
    detection: &Detection,
    recent: &[String],
    max_tools: usize,
) -> Vec<String> {
    let mut selected = Vec::new();
    let mut seen = HashSet::new();

    // Stage 1: always-include tools.
    if fill(&mut selected, &mut seen, registry.always_include_names(), max_tools) {
        return selected;
    }

    // Stage 2: the page the user is on.
    if let Some(category) = detection.page_category {
        if fill(&mut selected, &mut seen, registry.names_in(category), max_tools) {
            return selected;
        }
    }

    // Stage 3: keyword-matched categories, merged and name-sorted across
    // categories.
    let mut keyword_names: Vec<&str> = detection
        .keyword_categories
        .iter()
        .flat_map(|&category| registry.names_in(category))
        .collect();
    keyword_names.sort_unstable();
    if fill(&mut selected, &mut seen, keyword_names, max_tools) {
        return selected;
    }

    // Stage 4: recency, weakest signal last.
    let recent_known = recent
        .iter()
        .map(String::as_str)
        .filter(|name| registry.contains(name));
    fill(&mut selected, &mut seen, recent_known, max_tools);

    selected
}

/// Admit candidates in order until the cap is hit. Returns true when full.
fn fill<'a>(
    selected: &mut Vec<String>,
    seen: &mut HashSet<&'a str>,
    candidates: impl IntoIterator<Item = &'a str>,
    max_tools: usize,
) -> bool {
    for name in candidates {
        if selected.len() >= max_tools {
            return true;
        }
        if seen.insert(name) {
            selected.push(name.to_string());
        }
    }
    selected.len() >= max_tools
}
