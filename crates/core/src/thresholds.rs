//! Safety detection thresholds, hot-reloadable at runtime.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Thresholds driving the built-in safety detectors.
///
/// All values are tunable per deployment; the defaults suit a typical
/// ADS-B ground-station feed with a 2 s tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SafetyThresholds {
    /// Vertical rate above which a warning-level event fires (fpm).
    pub vs_change_fpm: i32,
    /// Vertical rate above which a critical-level event fires (fpm).
    pub vs_extreme_fpm: i32,
    /// Lateral separation limit for proximity conflicts (nautical miles).
    pub proximity_nm: f64,
    /// Vertical separation limit for proximity conflicts (feet).
    pub altitude_diff_ft: i32,
    /// Maximum age between the two snapshots of a vertical-rate reversal.
    /// Roughly two tick intervals; calibrate against deployment data.
    pub reversal_window_secs: u64,
    /// Repeat-suppression window per detector.
    pub cooldowns: DetectorCooldowns,
}

/// Seconds between repeated emissions of the same detector event for the
/// same subject. Proximity re-alerts sooner than rate events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DetectorCooldowns {
    pub extreme_vs_secs: u64,
    pub tcas_ra_secs: u64,
    pub proximity_secs: u64,
}

impl Default for SafetyThresholds {
    fn default() -> Self {
        Self {
            vs_change_fpm: 4_000,
            vs_extreme_fpm: 6_000,
            proximity_nm: 1.0,
            altitude_diff_ft: 1_000,
            reversal_window_secs: 4,
            cooldowns: DetectorCooldowns::default(),
        }
    }
}

impl Default for DetectorCooldowns {
    fn default() -> Self {
        Self {
            extreme_vs_secs: 300,
            tcas_ra_secs: 300,
            proximity_secs: 60,
        }
    }
}

/// Shared hot-reload handle. Readers take a cheap clone each tick so a
/// mid-tick reload never changes thresholds under a running scan.
#[derive(Debug, Clone, Default)]
pub struct SharedThresholds(Arc<RwLock<SafetyThresholds>>);

impl SharedThresholds {
    pub fn new(thresholds: SafetyThresholds) -> Self {
        Self(Arc::new(RwLock::new(thresholds)))
    }

    /// Snapshot the current thresholds.
    pub fn get(&self) -> SafetyThresholds {
        self.0.read().expect("thresholds lock poisoned").clone()
    }

    /// Replace the thresholds; takes effect on the next tick.
    pub fn set(&self, thresholds: SafetyThresholds) {
        *self.0.write().expect("thresholds lock poisoned") = thresholds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_ordered() {
        let t = SafetyThresholds::default();
        assert!(t.vs_change_fpm < t.vs_extreme_fpm);
        assert!(t.proximity_nm > 0.0);
        assert!(t.cooldowns.proximity_secs < t.cooldowns.extreme_vs_secs);
    }

    #[test]
    fn shared_handle_hot_reloads() {
        let shared = SharedThresholds::default();
        assert_eq!(shared.get().proximity_nm, 1.0);

        let mut t = shared.get();
        t.proximity_nm = 3.0;
        shared.set(t);
        assert_eq!(shared.get().proximity_nm, 3.0);
    }
}
