//! Repeat-suppression ledger shared by the safety detectors and the rule
//! evaluator.
//!
//! Keys are strongly typed composites supplied by the caller, e.g.
//! `(detector, icao)` or `(rule_id, icao)`, never ad-hoc string tuples.
//! State is process-local; across workers this means duplicate emissions
//! are bounded by worker count, never unbounded flooding.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Duration, Utc};

/// Tracks the last emission time per key and answers "may this fire again?".
#[derive(Debug, Clone)]
pub struct CooldownLedger<K> {
    last_fired: HashMap<K, DateTime<Utc>>,
}

impl<K: Eq + Hash> CooldownLedger<K> {
    pub fn new() -> Self {
        Self {
            last_fired: HashMap::new(),
        }
    }

    /// Fire the key if it is outside its window, recording `now` on success.
    ///
    /// A key fires when no prior emission exists or at least `window` has
    /// elapsed since the last one (an emission exactly at the window edge
    /// fires).
    pub fn try_fire(&mut self, key: K, window: Duration, now: DateTime<Utc>) -> bool {
        match self.last_fired.get(&key) {
            Some(last) if now.signed_duration_since(*last) < window => false,
            _ => {
                self.last_fired.insert(key, now);
                true
            }
        }
    }

    /// Whether the key is currently inside its window.
    pub fn is_cooling(&self, key: &K, window: Duration, now: DateTime<Utc>) -> bool {
        self.last_fired
            .get(key)
            .is_some_and(|last| now.signed_duration_since(*last) < window)
    }

    /// Drop entries older than `ttl`. Returns the number removed.
    pub fn evict_expired(&mut self, ttl: Duration, now: DateTime<Utc>) -> usize {
        let before = self.last_fired.len();
        self.last_fired
            .retain(|_, last| now.signed_duration_since(*last) < ttl);
        before - self.last_fired.len()
    }

    pub fn len(&self) -> usize {
        self.last_fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_fired.is_empty()
    }

    pub fn clear(&mut self) {
        self.last_fired.clear();
    }
}

impl<K: Eq + Hash> Default for CooldownLedger<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn fires_once_inside_window() {
        let mut ledger: CooldownLedger<(u64, &str)> = CooldownLedger::new();
        let window = Duration::seconds(300);

        assert!(ledger.try_fire((1, "abc123"), window, t(0)));
        assert!(!ledger.try_fire((1, "abc123"), window, t(299)));
        // Different key is independent.
        assert!(ledger.try_fire((2, "abc123"), window, t(299)));
    }

    #[test]
    fn refires_after_window_elapses() {
        let mut ledger: CooldownLedger<&str> = CooldownLedger::new();
        let window = Duration::seconds(300);

        assert!(ledger.try_fire("x", window, t(0)));
        assert!(ledger.try_fire("x", window, t(301)));
        assert!(!ledger.try_fire("x", window, t(400)));
    }

    #[test]
    fn window_edge_fires() {
        let mut ledger: CooldownLedger<&str> = CooldownLedger::new();
        let window = Duration::seconds(300);

        assert!(ledger.try_fire("x", window, t(0)));
        assert!(ledger.try_fire("x", window, t(300)));
    }

    #[test]
    fn eviction_drops_stale_entries() {
        let mut ledger: CooldownLedger<&str> = CooldownLedger::new();
        let window = Duration::seconds(10);

        ledger.try_fire("old", window, t(0));
        ledger.try_fire("new", window, t(500));
        assert_eq!(ledger.len(), 2);

        let removed = ledger.evict_expired(Duration::seconds(600), t(700));
        assert_eq!(removed, 1);
        assert_eq!(ledger.len(), 1);
        assert!(!ledger.is_cooling(&"old", window, t(700)));
    }
}
