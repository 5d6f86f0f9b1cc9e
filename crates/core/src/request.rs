//! Per-call values: the request context coming in, the filter result going out.
//!
//! Both are created and discarded within a single `filter` call; neither is
//! persisted anywhere.

use std::time::Duration;

use crate::tool::Category;

/// Everything the prefilter needs to know about one conversation turn.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Stable identifier of the user issuing the turn.
    pub user_id: String,

    /// The raw user message for this turn.
    pub message_text: String,

    /// The page / activity the user is currently on, if the client knows it.
    pub current_page: Option<String>,

    /// Caller-supplied recent-tool hint, e.g. from another device's session.
    /// Merged ahead of server-side recency state when present.
    pub recent_tools_hint: Option<Vec<String>>,
}

impl RequestContext {
    pub fn new(user_id: impl Into<String>, message_text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message_text: message_text.into(),
            current_page: None,
            recent_tools_hint: None,
        }
    }

    /// Attach the current page identifier.
    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.current_page = Some(page.into());
        self
    }

    /// Attach a recent-tools hint.
    pub fn with_recent_hint(mut self, tools: Vec<String>) -> Self {
        self.recent_tools_hint = Some(tools);
        self
    }
}

/// The outcome of one `filter` call.
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// Selected tool names, in exposure order, never more than the
    /// configured tool limit.
    pub ordered_tool_names: Vec<String>,

    /// Categories that matched this turn (page signal and keyword signal
    /// combined), sorted and deduplicated. Empty on the degraded path.
    pub matched_categories: Vec<Category>,

    /// True when filtering could not be trusted and the full registry was
    /// returned instead.
    pub degraded: bool,

    /// Wall-clock time the call took.
    pub elapsed: Duration,
}

impl FilterResult {
    /// Whether a tool name is part of the result.
    pub fn contains(&self, name: &str) -> bool {
        self.ordered_tool_names.iter().any(|n| n == name)
    }
}
