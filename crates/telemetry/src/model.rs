//! Metric record and snapshot types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One completed `filter` call, as recorded for observability.
#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    /// When the call completed.
    pub at: DateTime<Utc>,

    /// The requesting user.
    pub user_id: String,

    /// How many tools the call selected.
    pub selected: usize,

    /// Whether the call fell back to the full registry.
    pub degraded: bool,

    /// Pattern rules that exceeded their time ceiling during the call.
    pub pattern_timeouts: usize,

    /// Wall-clock duration of the call, in microseconds.
    pub elapsed_us: u64,
}

/// Aggregate view over all recorded calls.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    /// Total `filter` calls.
    pub calls: u64,

    /// Calls that returned the degraded full-registry result.
    pub degraded: u64,

    /// Total pattern-rule timeout events across all calls.
    pub pattern_timeouts: u64,

    /// Mean call duration in microseconds (0 when no calls yet).
    pub avg_elapsed_us: u64,

    /// Worst call duration in microseconds.
    pub max_elapsed_us: u64,
}
