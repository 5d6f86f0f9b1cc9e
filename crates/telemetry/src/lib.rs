//! Filter-call metrics: counts, degraded-fallback occurrences,
//! pattern-timeout occurrences, and per-call latency.
//!
//! Read-only to external observability tooling — no alerting or dashboard
//! logic lives here.

pub mod engine;
pub mod model;

pub use engine::FilterMetrics;
pub use model::{CallRecord, MetricsSnapshot};
