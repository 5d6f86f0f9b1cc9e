//! Tool descriptors and categories — the prefilter's read-only view of a tool.
//!
//! The registry owner defines what a tool *does*; the prefilter only needs a
//! name, a coarse category, and whether the tool is universally relevant.

use serde::{Deserialize, Serialize};

/// Coarse grouping of tools used to decide relevance for a turn.
///
/// The enumeration is fixed: categories are a contract between the rule
/// configuration, the page map, and the registry, so an open string type
/// would just move typos from compile time to run time. The serde
/// snake_case names are the stable spelling used in config files.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Financial,
    Trip,
    Calendar,
    Messaging,
    Documents,
    Search,
    System,
}

impl Category {
    /// All categories, in declaration order.
    pub const ALL: [Category; 7] = [
        Category::Financial,
        Category::Trip,
        Category::Calendar,
        Category::Messaging,
        Category::Documents,
        Category::Search,
        Category::System,
    ];

    /// The stable snake_case name, matching the serde spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Financial => "financial",
            Category::Trip => "trip",
            Category::Calendar => "calendar",
            Category::Messaging => "messaging",
            Category::Documents => "documents",
            Category::Search => "search",
            Category::System => "system",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single tool as the registry exposes it to the prefilter.
///
/// Immutable and owned by the registry; the prefilter never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique, stable identifier (e.g., "expense_report").
    pub name: String,

    /// The tool's category.
    pub category: Category,

    /// Whether this tool is exposed on every turn regardless of detected
    /// category (e.g., a clock or location lookup).
    #[serde(default)]
    pub always_include: bool,
}

impl ToolDescriptor {
    /// A regular, category-gated tool.
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            always_include: false,
        }
    }

    /// An always-include tool.
    pub fn always(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            always_include: true,
        }
    }
}
