//! The immutable registry snapshot the prefilter reads.
//!
//! The registry owner constructs one of these at startup (and a fresh one
//! for hot-reload); the prefilter only ever reads it. Tools are stored
//! sorted by name, so "registry natural order" and alphabetical order
//! coincide — that sort is what makes stage truncation deterministic.

use std::collections::HashMap;

use crate::error::RegistryError;
use crate::tool::{Category, ToolDescriptor};

/// An immutable, indexed snapshot of the tool catalogue.
#[derive(Debug)]
pub struct RegistrySnapshot {
    /// All tools, sorted by name.
    tools: Vec<ToolDescriptor>,
    /// Indexes into `tools`, grouped by category (each group name-sorted).
    by_category: HashMap<Category, Vec<usize>>,
    /// Indexes into `tools` for always-include tools (name-sorted).
    always_include: Vec<usize>,
}

impl RegistrySnapshot {
    /// Build a snapshot from a tool list.
    ///
    /// Rejects duplicate tool names: a catalogue with two tools of the same
    /// name cannot produce a meaningful deduplicated selection.
    pub fn from_tools(mut tools: Vec<ToolDescriptor>) -> Result<Self, RegistryError> {
        tools.sort_by(|a, b| a.name.cmp(&b.name));

        for pair in tools.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(RegistryError::DuplicateTool(pair[0].name.clone()));
            }
        }

        let mut by_category: HashMap<Category, Vec<usize>> = HashMap::new();
        let mut always_include = Vec::new();
        for (i, tool) in tools.iter().enumerate() {
            by_category.entry(tool.category).or_default().push(i);
            if tool.always_include {
                always_include.push(i);
            }
        }

        Ok(Self {
            tools,
            by_category,
            always_include,
        })
    }

    /// Number of tools in the snapshot.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the snapshot holds no tools.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools
            .binary_search_by(|t| t.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.tools[i])
    }

    /// Whether a tool with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All tools, name-sorted.
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// All tool names, name-sorted.
    pub fn all_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    /// Names of always-include tools, name-sorted.
    pub fn always_include_names(&self) -> impl Iterator<Item = &str> {
        self.always_include.iter().map(|&i| self.tools[i].name.as_str())
    }

    /// Number of always-include tools.
    pub fn always_include_count(&self) -> usize {
        self.always_include.len()
    }

    /// Names of tools in a category, name-sorted. Empty if the category has
    /// no tools.
    pub fn names_in(&self, category: Category) -> impl Iterator<Item = &str> {
        self.by_category
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|&i| self.tools[i].name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> RegistrySnapshot {
        RegistrySnapshot::from_tools(vec![
            ToolDescriptor::new("flight_search", Category::Trip),
            ToolDescriptor::always("current_time", Category::System),
            ToolDescriptor::new("expense_report", Category::Financial),
            ToolDescriptor::new("budget_overview", Category::Financial),
            ToolDescriptor::always("user_location", Category::System),
        ])
        .unwrap()
    }

    #[test]
    fn tools_are_name_sorted() {
        let snapshot = sample_snapshot();
        let names = snapshot.all_names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names[0], "budget_overview");
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = RegistrySnapshot::from_tools(vec![
            ToolDescriptor::new("dup", Category::Trip),
            ToolDescriptor::new("dup", Category::Financial),
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(name) if name == "dup"));
    }

    #[test]
    fn lookup_by_name() {
        let snapshot = sample_snapshot();
        assert!(snapshot.contains("expense_report"));
        assert!(!snapshot.contains("nonexistent"));
        assert_eq!(
            snapshot.get("current_time").unwrap().category,
            Category::System
        );
    }

    #[test]
    fn category_index_is_sorted() {
        let snapshot = sample_snapshot();
        let financial: Vec<&str> = snapshot.names_in(Category::Financial).collect();
        assert_eq!(financial, vec!["budget_overview", "expense_report"]);

        let none: Vec<&str> = snapshot.names_in(Category::Messaging).collect();
        assert!(none.is_empty());
    }

    #[test]
    fn always_include_index() {
        let snapshot = sample_snapshot();
        let always: Vec<&str> = snapshot.always_include_names().collect();
        assert_eq!(always, vec!["current_time", "user_location"]);
        assert_eq!(snapshot.always_include_count(), 2);
    }

    #[test]
    fn empty_snapshot_is_valid() {
        let snapshot = RegistrySnapshot::from_tools(vec![]).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.always_include_count(), 0);
    }
}
