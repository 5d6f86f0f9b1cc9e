//! The prefilter facade — single entry point, owns the failure boundary.
//!
//! Each call is a linear pipeline: detect categories, read recency, select,
//! return. There is exactly one escape edge: any error or panic anywhere in
//! the pipeline becomes the full-registry degraded result. The fallback is
//! a hard requirement, not an optimization — a filtering bug must never
//! prevent the assistant from reaching a tool it needs.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use toolgate_config::{PrefilterConfig, RuleSpec};
use toolgate_core::{
    Category, Error, FilterResult, RegistrySnapshot, RequestContext, Result, SelectionError,
};
use toolgate_matcher::{
    CategoryDetector, CategoryRuleSet, Detect, PageCategoryMap, PatternMatcher, PatternRule,
};
use toolgate_recency::RecencyTracker;
use toolgate_telemetry::{FilterMetrics, MetricsSnapshot};

use crate::selector;

/// What one successful pipeline run produced.
struct Selected {
    names: Vec<String>,
    categories: Vec<Category>,
    pattern_timeouts: usize,
}

/// The tool-prefiltering admission-control facade.
///
/// Owns the category detector, the recency tracker, the metrics engine,
/// and the current registry snapshot. Cheap to share behind an `Arc`;
/// every method takes `&self`.
pub struct Prefilter {
    registry: RwLock<Arc<RegistrySnapshot>>,
    detector: Box<dyn Detect>,
    recency: RecencyTracker,
    metrics: Arc<FilterMetrics>,
    max_tools: usize,
}

impl Prefilter {
    /// Build a facade from already-constructed parts.
    ///
    /// Fails if the tool limit cannot hold every always-include tool —
    /// otherwise the always-include invariant and the size bound would
    /// contradict each other at request time.
    pub fn new(
        registry: Arc<RegistrySnapshot>,
        detector: Box<dyn Detect>,
        recency: RecencyTracker,
        max_tools: usize,
    ) -> Result<Self> {
        Self::check_limit(&registry, max_tools)?;
        Ok(Self {
            registry: RwLock::new(registry),
            detector,
            recency,
            metrics: Arc::new(FilterMetrics::new()),
            max_tools,
        })
    }

    /// Build the production pipeline from a validated configuration:
    /// compiled rule sets, page map, bounded matcher, recency tracker.
    pub fn from_config(registry: Arc<RegistrySnapshot>, config: &PrefilterConfig) -> Result<Self> {
        config.validate().map_err(|e| Error::Config {
            message: e.to_string(),
        })?;

        let mut rule_sets = Vec::with_capacity(config.rules.len());
        for (&category, specs) in &config.rules {
            let mut rules = Vec::with_capacity(specs.len());
            for spec in specs {
                let rule = match spec {
                    RuleSpec::Keyword { pattern } => PatternRule::keyword(pattern.clone()),
                    RuleSpec::Regex { pattern } => PatternRule::regex(pattern.clone()),
                }
                .map_err(|e| Error::Config {
                    message: e.to_string(),
                })?;
                rules.push(rule);
            }
            rule_sets.push(CategoryRuleSet::new(category, rules));
        }

        let pages = PageCategoryMap::from_iter(
            config.pages.iter().map(|(page, &category)| (page.clone(), category)),
        );
        let matcher = PatternMatcher::new(
            config.limits.max_message_chars,
            config.limits.rule_timeout(),
        );
        let detector = CategoryDetector::new(rule_sets, pages, matcher);
        let recency = RecencyTracker::new(
            config.limits.recent_per_user,
            config.limits.max_tracked_users,
        );

        Self::new(registry, Box::new(detector), recency, config.limits.max_tools)
    }

    /// Select the tools to expose for one turn.
    ///
    /// Never fails and never panics outward: pipeline errors and panics
    /// both collapse into the full-registry degraded result.
    pub fn filter(&self, ctx: &RequestContext) -> FilterResult {
        let started = Instant::now();
        let registry = Arc::clone(&self.registry.read().unwrap());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_pipeline(&registry, ctx)));

        match outcome {
            Ok(Ok(selected)) => {
                let elapsed = started.elapsed();
                self.metrics.record_call(
                    &ctx.user_id,
                    selected.names.len(),
                    false,
                    selected.pattern_timeouts,
                    elapsed,
                );
                FilterResult {
                    ordered_tool_names: selected.names,
                    matched_categories: selected.categories,
                    degraded: false,
                    elapsed,
                }
            }
            Ok(Err(err)) => {
                warn!(
                    user = %ctx.user_id,
                    error = %err,
                    "filter pipeline failed, falling back to full registry"
                );
                self.degraded_result(&registry, &ctx.user_id, started)
            }
            Err(_) => {
                warn!(
                    user = %ctx.user_id,
                    "filter pipeline panicked, falling back to full registry"
                );
                self.degraded_result(&registry, &ctx.user_id, started)
            }
        }
    }

    /// Report that a tool was actually invoked after the model turn.
    /// Fire-and-forget; unknown tool names are dropped so garbage can
    /// never occupy a recency slot.
    pub fn notify_tool_used(&self, user_id: &str, tool_name: &str) {
        if !self.registry.read().unwrap().contains(tool_name) {
            debug!(user = %user_id, tool = %tool_name, "ignoring usage report for unknown tool");
            return;
        }
        debug!(user = %user_id, tool = %tool_name, "recording tool usage");
        self.recency.record_usage(user_id, tool_name);
    }

    /// Atomically replace the registry snapshot for subsequent calls.
    /// In-flight calls keep the snapshot they started with.
    pub fn swap_registry(&self, next: Arc<RegistrySnapshot>) -> Result<()> {
        Self::check_limit(&next, self.max_tools)?;
        *self.registry.write().unwrap() = next;
        info!("registry snapshot swapped");
        Ok(())
    }

    /// The snapshot current calls are using.
    pub fn registry(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.registry.read().unwrap())
    }

    /// Aggregate metrics since construction.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Shared handle to the metrics engine, for observability tooling.
    pub fn metrics_handle(&self) -> Arc<FilterMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Users currently tracked for recency.
    pub fn tracked_users(&self) -> usize {
        self.recency.tracked_users()
    }

    pub fn max_tools(&self) -> usize {
        self.max_tools
    }

    // ── Pipeline ──────────────────────────────────────────────────────

    fn run_pipeline(&self, registry: &RegistrySnapshot, ctx: &RequestContext) -> Result<Selected> {
        let detection = self
            .detector
            .detect(&ctx.message_text, ctx.current_page.as_deref())?;
        let recent = self.recent_tools_for(ctx);
        let names = selector::select(registry, &detection, &recent, self.max_tools);

        // Selection post-conditions; a violation degrades the call.
        if names.len() > self.max_tools {
            return Err(SelectionError::InvariantViolation(format!(
                "selected {} tools, limit is {}",
                names.len(),
                self.max_tools
            ))
            .into());
        }
        for always in registry.always_include_names() {
            if !names.iter().any(|n| n == always) {
                return Err(SelectionError::InvariantViolation(format!(
                    "always-include tool '{always}' missing from selection"
                ))
                .into());
            }
        }

        Ok(Selected {
            names,
            categories: detection.categories().into_iter().collect(),
            pattern_timeouts: detection.timed_out_rules,
        })
    }

    /// Merge the caller's recency hint (fresher context, e.g. another
    /// device) ahead of tracked state, deduplicated, capped at R.
    fn recent_tools_for(&self, ctx: &RequestContext) -> Vec<String> {
        let tracked = self.recency.recent_for(&ctx.user_id);
        match &ctx.recent_tools_hint {
            None => tracked,
            Some(hint) => {
                let mut merged: Vec<String> = Vec::new();
                for name in hint.iter().chain(tracked.iter()) {
                    if !merged.iter().any(|m| m == name) {
                        merged.push(name.clone());
                    }
                }
                merged.truncate(self.recency.per_user_capacity());
                merged
            }
        }
    }

    fn degraded_result(
        &self,
        registry: &RegistrySnapshot,
        user_id: &str,
        started: Instant,
    ) -> FilterResult {
        let names = registry.all_names();
        let elapsed = started.elapsed();
        self.metrics.record_call(user_id, names.len(), true, 0, elapsed);
        FilterResult {
            ordered_tool_names: names,
            matched_categories: Vec::new(),
            degraded: true,
            elapsed,
        }
    }

    fn check_limit(registry: &RegistrySnapshot, max_tools: usize) -> Result<()> {
        let required = registry.always_include_count();
        if required > max_tools {
            return Err(SelectionError::LimitTooSmall {
                limit: max_tools,
                required,
            }
            .into());
        }
        Ok(())
    }
}

impl std::fmt::Debug for Prefilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prefilter")
            .field("max_tools", &self.max_tools)
            .field("registry_len", &self.registry().len())
            .field("tracked_users", &self.tracked_users())
            .finish()
    }
}
