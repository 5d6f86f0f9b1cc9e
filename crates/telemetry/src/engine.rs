//! Thread-safe metrics engine — running totals plus a bounded buffer of
//! recent per-call records.

use std::sync::RwLock;
use std::time::Duration;

use chrono::Utc;

use crate::model::{CallRecord, MetricsSnapshot};

/// Cap on buffered call records; exceeding it prunes the oldest tenth.
const MAX_CALL_RECORDS: usize = 5_000;

/// Internal running totals for fast snapshots.
#[derive(Debug, Default)]
struct RunningTotals {
    calls: u64,
    degraded: u64,
    pattern_timeouts: u64,
    total_elapsed: Duration,
    max_elapsed: Duration,
}

/// Collects per-call filter metrics.
///
/// Thread-safe via `RwLock`; recording is a short write-lock append,
/// snapshots are read-only.
pub struct FilterMetrics {
    totals: RwLock<RunningTotals>,
    calls: RwLock<Vec<CallRecord>>,
}

impl FilterMetrics {
    pub fn new() -> Self {
        Self {
            totals: RwLock::new(RunningTotals::default()),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Record one completed `filter` call.
    pub fn record_call(
        &self,
        user_id: &str,
        selected: usize,
        degraded: bool,
        pattern_timeouts: usize,
        elapsed: Duration,
    ) {
        {
            let mut totals = self.totals.write().unwrap();
            totals.calls += 1;
            if degraded {
                totals.degraded += 1;
            }
            totals.pattern_timeouts += pattern_timeouts as u64;
            totals.total_elapsed += elapsed;
            if elapsed > totals.max_elapsed {
                totals.max_elapsed = elapsed;
            }
        }

        let mut calls = self.calls.write().unwrap();
        if calls.len() >= MAX_CALL_RECORDS {
            calls.drain(..MAX_CALL_RECORDS / 10);
        }
        calls.push(CallRecord {
            at: Utc::now(),
            user_id: user_id.to_string(),
            selected,
            degraded,
            pattern_timeouts,
            elapsed_us: elapsed.as_micros() as u64,
        });
    }

    /// Aggregate totals since engine creation.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let totals = self.totals.read().unwrap();
        let avg_elapsed_us = if totals.calls == 0 {
            0
        } else {
            (totals.total_elapsed.as_micros() / totals.calls as u128) as u64
        };

        MetricsSnapshot {
            calls: totals.calls,
            degraded: totals.degraded,
            pattern_timeouts: totals.pattern_timeouts,
            avg_elapsed_us,
            max_elapsed_us: totals.max_elapsed.as_micros() as u64,
        }
    }

    /// Most recent call records, newest first.
    pub fn recent_calls(&self, limit: usize) -> Vec<CallRecord> {
        let calls = self.calls.read().unwrap();
        calls.iter().rev().take(limit).cloned().collect()
    }

    /// Total calls recorded.
    pub fn call_count(&self) -> u64 {
        self.totals.read().unwrap().calls
    }
}

impl Default for FilterMetrics {
    fn default() -> Self {
        Self::new()
    }
}
