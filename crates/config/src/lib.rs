//! Configuration loading, validation, and defaults for the toolgate prefilter.
//!
//! Loads a TOML document with serde field defaults, so an empty file (or no
//! file at all) yields a working configuration: the built-in rule catalog
//! and page map make the filter useful with zero setup. Everything is
//! validated before the filter is built — limits of zero and empty patterns
//! are config mistakes, not runtime surprises.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use toolgate_core::Category;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root prefilter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefilterConfig {
    /// Size and time limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Pattern rules per category.
    #[serde(default = "default_rules")]
    pub rules: BTreeMap<Category, Vec<RuleSpec>>,

    /// Page identifier → category.
    #[serde(default = "default_pages")]
    pub pages: BTreeMap<String, Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum tools exposed per turn (K_max).
    #[serde(default = "default_max_tools")]
    pub max_tools: usize,

    /// Recent tools remembered per user (R).
    #[serde(default = "default_recent_per_user")]
    pub recent_per_user: usize,

    /// Maximum users tracked for recency (U_max).
    #[serde(default = "default_max_tracked_users")]
    pub max_tracked_users: usize,

    /// Message length cap applied before pattern matching.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Per-rule evaluation time ceiling, in milliseconds.
    #[serde(default = "default_rule_timeout_ms")]
    pub rule_timeout_ms: u64,
}

fn default_max_tools() -> usize {
    10
}
fn default_recent_per_user() -> usize {
    5
}
fn default_max_tracked_users() -> usize {
    10_000
}
fn default_max_message_chars() -> usize {
    4_000
}
fn default_rule_timeout_ms() -> u64 {
    25
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tools: default_max_tools(),
            recent_per_user: default_recent_per_user(),
            max_tracked_users: default_max_tracked_users(),
            max_message_chars: default_max_message_chars(),
            rule_timeout_ms: default_rule_timeout_ms(),
        }
    }
}

impl LimitsConfig {
    /// The per-rule ceiling as a `Duration`.
    pub fn rule_timeout(&self) -> Duration {
        Duration::from_millis(self.rule_timeout_ms)
    }
}

/// One pattern rule as configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    /// Case-insensitive substring match.
    Keyword { pattern: String },
    /// Case-insensitive regex match.
    Regex { pattern: String },
}

impl RuleSpec {
    pub fn pattern(&self) -> &str {
        match self {
            RuleSpec::Keyword { pattern } | RuleSpec::Regex { pattern } => pattern,
        }
    }
}

fn keyword(pattern: &str) -> RuleSpec {
    RuleSpec::Keyword {
        pattern: pattern.to_string(),
    }
}

/// The built-in rule catalog. Keywords lean broad: a false negative hides
/// a tool, a false positive only spends a list slot.
fn default_rules() -> BTreeMap<Category, Vec<RuleSpec>> {
    BTreeMap::from([
        (
            Category::Financial,
            ["expense", "budget", "invoice", "payment", "spend", "receipt"]
                .map(keyword)
                .to_vec(),
        ),
        (
            Category::Trip,
            ["trip", "flight", "hotel", "travel", "itinerary", "book"]
                .map(keyword)
                .to_vec(),
        ),
        (
            Category::Calendar,
            ["meeting", "schedule", "calendar", "appointment", "remind"]
                .map(keyword)
                .to_vec(),
        ),
        (
            Category::Messaging,
            ["email", "message", "send", "reply", "inbox"]
                .map(keyword)
                .to_vec(),
        ),
        (
            Category::Documents,
            ["document", "file", "note", "draft"].map(keyword).to_vec(),
        ),
        (
            Category::Search,
            ["search", "find", "look up", "lookup"].map(keyword).to_vec(),
        ),
    ])
}

/// The built-in page map.
fn default_pages() -> BTreeMap<String, Category> {
    BTreeMap::from([
        ("expenses".to_string(), Category::Financial),
        ("budget".to_string(), Category::Financial),
        ("trips".to_string(), Category::Trip),
        ("calendar".to_string(), Category::Calendar),
        ("inbox".to_string(), Category::Messaging),
        ("documents".to_string(), Category::Documents),
    ])
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            limits: LimitsConfig::default(),
            rules: default_rules(),
            pages: default_pages(),
        }
    }
}

impl PrefilterConfig {
    /// Parse and validate a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        info!(path = %path.display(), "loaded prefilter configuration");
        Ok(config)
    }

    /// Check limits and patterns. Regex compilation is checked later, when
    /// the filter is built and the rules are actually compiled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_tools == 0 {
            return Err(ConfigError::Invalid("limits.max_tools must be at least 1".into()));
        }
        if self.limits.recent_per_user == 0 {
            return Err(ConfigError::Invalid(
                "limits.recent_per_user must be at least 1".into(),
            ));
        }
        if self.limits.max_tracked_users == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_tracked_users must be at least 1".into(),
            ));
        }
        if self.limits.max_message_chars == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_message_chars must be at least 1".into(),
            ));
        }
        if self.limits.rule_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "limits.rule_timeout_ms must be at least 1".into(),
            ));
        }

        for (category, rules) in &self.rules {
            for rule in rules {
                if rule.pattern().trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "empty pattern in rules for category '{category}'"
                    )));
                }
            }
        }

        Ok(())
    }
}
