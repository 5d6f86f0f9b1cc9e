//! Per-user recency tracking — bounded, concurrent, LRU-evicting.
//!
//! The tracker is the only long-lived mutable state in the prefilter. Two
//! bounds hold at all times: each user keeps at most `per_user_capacity`
//! recent tool names, and at most `max_users` users are tracked; inserting
//! past either bound evicts oldest-first.
//!
//! ## Locking discipline
//!
//! The user map sits behind an `RwLock`; each user's entry behind its own
//! `Mutex`. The hot paths (`record_usage` on a known user, `recent_for`)
//! take the map read lock plus one user mutex, so concurrent requests from
//! different users never contend. Only inserting a new user — and the
//! eviction that may come with it — takes the map write lock. Lock order
//! is always map before user, never the reverse.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

/// One user's recent tools, most-recent-first, plus the touch stamp the
/// population eviction ranks by.
#[derive(Debug)]
struct UserEntry {
    tools: VecDeque<String>,
    last_touched: u64,
}

impl UserEntry {
    fn new(stamp: u64) -> Self {
        Self {
            tools: VecDeque::new(),
            last_touched: stamp,
        }
    }

    /// Move-to-front insert: an already-present tool is promoted rather
    /// than duplicated; overflow drops the oldest entry.
    fn push_front(&mut self, tool_name: &str, capacity: usize) {
        if let Some(pos) = self.tools.iter().position(|t| t == tool_name) {
            self.tools.remove(pos);
        }
        self.tools.push_front(tool_name.to_string());
        self.tools.truncate(capacity);
    }
}

/// Bounded store of per-user recent tool usage.
pub struct RecencyTracker {
    per_user_capacity: usize,
    max_users: usize,
    /// Monotonic touch sequence; wall clocks can go backwards, this can't.
    clock: AtomicU64,
    users: RwLock<HashMap<String, Arc<Mutex<UserEntry>>>>,
}

impl RecencyTracker {
    pub fn new(per_user_capacity: usize, max_users: usize) -> Self {
        Self {
            per_user_capacity,
            max_users,
            clock: AtomicU64::new(0),
            users: RwLock::new(HashMap::new()),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record that a user invoked a tool.
    ///
    /// Idempotent-safe: a tool already in the user's set moves to the
    /// front. A new user beyond `max_users` evicts the least-recently
    /// touched user first, so the population bound holds at all times.
    pub fn record_usage(&self, user_id: &str, tool_name: &str) {
        if self.max_users == 0 || self.per_user_capacity == 0 {
            return;
        }

        // Fast path: known user, map read lock + user mutex only.
        {
            let users = self.users.read().unwrap();
            if let Some(slot) = users.get(user_id) {
                let mut entry = slot.lock().unwrap();
                entry.last_touched = self.tick();
                entry.push_front(tool_name, self.per_user_capacity);
                return;
            }
        }

        // Slow path: new user. Re-check under the write lock; another
        // writer may have inserted this user between the two locks.
        let mut users = self.users.write().unwrap();
        if let Some(slot) = users.get(user_id) {
            let mut entry = slot.lock().unwrap();
            entry.last_touched = self.tick();
            entry.push_front(tool_name, self.per_user_capacity);
            return;
        }

        if users.len() >= self.max_users {
            self.evict_lru(&mut users);
        }

        let mut entry = UserEntry::new(self.tick());
        entry.push_front(tool_name, self.per_user_capacity);
        users.insert(user_id.to_string(), Arc::new(Mutex::new(entry)));
    }

    /// The user's recent tools, most-recent-first, up to
    /// `per_user_capacity` entries. Unknown users get an empty list.
    ///
    /// Reading also refreshes the user's touch stamp: a user actively
    /// filtering is not an eviction candidate.
    pub fn recent_for(&self, user_id: &str) -> Vec<String> {
        let users = self.users.read().unwrap();
        match users.get(user_id) {
            Some(slot) => {
                let mut entry = slot.lock().unwrap();
                entry.last_touched = self.tick();
                entry.tools.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Number of users currently tracked. Never exceeds `max_users`.
    pub fn tracked_users(&self) -> usize {
        self.users.read().unwrap().len()
    }

    /// Drop all tracked state.
    pub fn clear(&self) {
        self.users.write().unwrap().clear();
    }

    pub fn per_user_capacity(&self) -> usize {
        self.per_user_capacity
    }

    pub fn max_users(&self) -> usize {
        self.max_users
    }

    /// Evict the least-recently-touched user. Caller holds the map write
    /// lock, so no fast-path reader can hold a user mutex concurrently and
    /// the inner locks below cannot block.
    fn evict_lru(&self, users: &mut HashMap<String, Arc<Mutex<UserEntry>>>) {
        let victim = users
            .iter()
            .min_by_key(|(_, slot)| slot.lock().unwrap().last_touched)
            .map(|(id, _)| id.clone());

        if let Some(id) = victim {
            users.remove(&id);
            debug!(user = %id, "evicted least-recently-touched user from recency tracking");
        }
    }
}

impl std::fmt::Debug for RecencyTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecencyTracker")
            .field("per_user_capacity", &self.per_user_capacity)
            .field("max_users", &self.max_users)
            .field("tracked_users", &self.tracked_users())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_returns_empty() {
        let tracker = RecencyTracker::new(5, 100);
        assert!(tracker.recent_for("nobody").is_empty());
        assert_eq!(tracker.tracked_users(), 0);
    }

    #[test]
    fn records_most_recent_first() {
        let tracker = RecencyTracker::new(5, 100);
        tracker.record_usage("u1", "calculator");
        tracker.record_usage("u1", "weather");
        tracker.record_usage("u1", "calendar");

        assert_eq!(tracker.recent_for("u1"), vec!["calendar", "weather", "calculator"]);
    }

    #[test]
    fn repeat_usage_moves_to_front_without_duplicating() {
        let tracker = RecencyTracker::new(5, 100);
        tracker.record_usage("u1", "calculator");
        tracker.record_usage("u1", "weather");
        tracker.record_usage("u1", "calculator");

        assert_eq!(tracker.recent_for("u1"), vec!["calculator", "weather"]);
    }

    #[test]
    fn per_user_overflow_drops_oldest() {
        let tracker = RecencyTracker::new(3, 100);
        for tool in ["a", "b", "c", "d"] {
            tracker.record_usage("u1", tool);
        }

        assert_eq!(tracker.recent_for("u1"), vec!["d", "c", "b"]);
    }

    #[test]
    fn population_bound_holds_and_evicts_lru() {
        let tracker = RecencyTracker::new(5, 3);
        tracker.record_usage("u1", "t");
        tracker.record_usage("u2", "t");
        tracker.record_usage("u3", "t");

        // Touch u1 so u2 becomes the LRU.
        tracker.record_usage("u1", "t2");

        tracker.record_usage("u4", "t");
        assert_eq!(tracker.tracked_users(), 3);
        assert!(tracker.recent_for("u2").is_empty());
        assert!(!tracker.recent_for("u1").is_empty());
        assert!(!tracker.recent_for("u4").is_empty());
    }

    #[test]
    fn reading_refreshes_eviction_stamp() {
        let tracker = RecencyTracker::new(5, 2);
        tracker.record_usage("u1", "t");
        tracker.record_usage("u2", "t");

        // u1 is older by insertion, but an active reader — u2 should be
        // the eviction victim.
        tracker.recent_for("u1");

        tracker.record_usage("u3", "t");
        assert!(!tracker.recent_for("u1").is_empty());
        assert!(tracker.recent_for("u2").is_empty());
    }

    #[test]
    fn zero_capacity_tracks_nothing() {
        let tracker = RecencyTracker::new(0, 100);
        tracker.record_usage("u1", "t");
        assert!(tracker.recent_for("u1").is_empty());
        assert_eq!(tracker.tracked_users(), 0);
    }

    #[test]
    fn clear_drops_everyone() {
        let tracker = RecencyTracker::new(5, 100);
        tracker.record_usage("u1", "t");
        tracker.record_usage("u2", "t");
        tracker.clear();
        assert_eq!(tracker.tracked_users(), 0);
    }

    #[test]
    fn concurrent_same_user_never_corrupts_entry() {
        let tracker = Arc::new(RecencyTracker::new(5, 100));

        std::thread::scope(|scope| {
            for i in 0..8 {
                let tracker = Arc::clone(&tracker);
                scope.spawn(move || {
                    for j in 0..50 {
                        tracker.record_usage("shared", &format!("tool-{}", (i + j) % 10));
                        let recent = tracker.recent_for("shared");
                        assert!(recent.len() <= 5);
                    }
                });
            }
        });

        let recent = tracker.recent_for("shared");
        assert!(recent.len() <= 5);
        let mut deduped = recent.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), recent.len(), "duplicate entries after concurrent updates");
    }

    #[test]
    fn concurrent_distinct_users_respect_population_bound() {
        let tracker = Arc::new(RecencyTracker::new(3, 16));

        std::thread::scope(|scope| {
            for t in 0..8 {
                let tracker = Arc::clone(&tracker);
                scope.spawn(move || {
                    for u in 0..40 {
                        tracker.record_usage(&format!("user-{t}-{u}"), "tool");
                    }
                });
            }
        });

        assert!(tracker.tracked_users() <= 16);
    }
}
