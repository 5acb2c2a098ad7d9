//! Built-in safety detectors: extreme vertical rates, TCAS-RA-like
//! reversals, and pairwise proximity conflicts.
//!
//! A scan never aborts on one bad aircraft; missing fields simply exclude
//! that aircraft from the detector that needs them. Repeat emissions are
//! suppressed per (detector, subject) by a process-local cooldown ledger.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::debug;

use skywarden_core::{
    AircraftSnapshot, CooldownLedger, Event, EventKind, SafetyThresholds, Severity,
};

use crate::geo::haversine_nm;
use crate::grid::ProximityIndex;
use crate::store::AircraftStateStore;

/// Cooldown subject: one aircraft, or an unordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    Single(String),
    Pair(String, String),
}

impl Subject {
    fn single(icao: &str) -> Self {
        Subject::Single(icao.to_string())
    }

    /// Pair subject, normalized so argument order never matters.
    fn pair(a: &str, b: &str) -> Self {
        if a <= b {
            Subject::Pair(a.to_string(), b.to_string())
        } else {
            Subject::Pair(b.to_string(), a.to_string())
        }
    }
}

/// Composite cooldown key for the safety ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafetyKey {
    pub kind: EventKind,
    pub subject: Subject,
}

/// Per-tick anomaly scanner over the state store and proximity index.
pub struct SafetyDetector {
    cooldowns: CooldownLedger<SafetyKey>,
}

impl SafetyDetector {
    pub fn new() -> Self {
        Self {
            cooldowns: CooldownLedger::new(),
        }
    }

    /// Run all detectors for one tick against the fully-applied store.
    pub fn scan(
        &mut self,
        store: &AircraftStateStore,
        index: &ProximityIndex,
        thresholds: &SafetyThresholds,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        let mut events = Vec::new();

        for track in store.tracks() {
            // Rate detectors need delta context: a lone first sighting
            // is not enough to distinguish noise from a real excursion.
            if track.previous.is_none() {
                continue;
            }
            self.check_extreme_vs(&track.current, thresholds, now, &mut events);
            if let (Some((prev_vr, curr_vr)), Some(gap)) =
                (track.vertical_rate_pair(), track.snapshot_gap_secs())
            {
                self.check_reversal(
                    &track.current,
                    prev_vr,
                    curr_vr,
                    gap,
                    thresholds,
                    now,
                    &mut events,
                );
            }
        }

        self.check_proximity(index, thresholds, now, &mut events);

        // Ledger hygiene: anything older than the longest window is dead.
        let ttl = Duration::seconds(
            thresholds
                .cooldowns
                .extreme_vs_secs
                .max(thresholds.cooldowns.tcas_ra_secs)
                .max(thresholds.cooldowns.proximity_secs) as i64
                * 2,
        );
        self.cooldowns.evict_expired(ttl, now);

        events
    }

    fn check_extreme_vs(
        &mut self,
        snap: &AircraftSnapshot,
        thresholds: &SafetyThresholds,
        now: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) {
        let Some(vr) = snap.vertical_rate else { return };

        let severity = if vr.abs() >= thresholds.vs_extreme_fpm {
            Severity::Critical
        } else if vr.abs() >= thresholds.vs_change_fpm {
            Severity::Warning
        } else {
            return;
        };

        let key = SafetyKey {
            kind: EventKind::ExtremeVs,
            subject: Subject::single(&snap.icao_hex),
        };
        let window = Duration::seconds(thresholds.cooldowns.extreme_vs_secs as i64);
        if !self.cooldowns.try_fire(key, window, now) {
            return;
        }

        let direction = if vr > 0 { "climb" } else { "descent" };
        events.push(Event::single(
            EventKind::ExtremeVs,
            severity,
            snap.clone(),
            format!("{} {} at {} fpm", snap.icao_hex, direction, vr.abs()),
            json!({
                "vertical_rate_fpm": vr,
                "warning_threshold_fpm": thresholds.vs_change_fpm,
                "critical_threshold_fpm": thresholds.vs_extreme_fpm,
            }),
            now,
        ));
    }

    #[allow(clippy::too_many_arguments)]
    fn check_reversal(
        &mut self,
        snap: &AircraftSnapshot,
        prev_vr: i32,
        curr_vr: i32,
        gap_secs: i64,
        thresholds: &SafetyThresholds,
        now: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) {
        // Sign flip between consecutive snapshots...
        if (prev_vr as i64) * (curr_vr as i64) >= 0 {
            return;
        }
        // ...with a magnitude swing at least as large as the extreme-rate
        // threshold, inside the reversal window (two snapshots further
        // apart are a maneuver, not an advisory response).
        let delta = (curr_vr as i64 - prev_vr as i64).unsigned_abs();
        if delta < thresholds.vs_extreme_fpm as u64 {
            return;
        }
        if gap_secs < 0 || gap_secs as u64 > thresholds.reversal_window_secs {
            return;
        }

        let key = SafetyKey {
            kind: EventKind::TcasRaLike,
            subject: Subject::single(&snap.icao_hex),
        };
        let window = Duration::seconds(thresholds.cooldowns.tcas_ra_secs as i64);
        if !self.cooldowns.try_fire(key, window, now) {
            return;
        }

        events.push(Event::single(
            EventKind::TcasRaLike,
            Severity::Critical,
            snap.clone(),
            format!(
                "{} vertical rate reversed {} -> {} fpm in {}s",
                snap.icao_hex, prev_vr, curr_vr, gap_secs
            ),
            json!({
                "previous_vertical_rate_fpm": prev_vr,
                "current_vertical_rate_fpm": curr_vr,
                "delta_fpm": delta,
                "gap_secs": gap_secs,
            }),
            now,
        ));
    }

    fn check_proximity(
        &mut self,
        index: &ProximityIndex,
        thresholds: &SafetyThresholds,
        now: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) {
        for (a, b) in index.candidate_pairs() {
            let (Some((lat_a, lon_a)), Some((lat_b, lon_b))) = (a.position(), b.position())
            else {
                continue;
            };
            let (Some(alt_a), Some(alt_b)) = (a.altitude_baro, b.altitude_baro) else {
                // No vertical context; a lateral hit alone is meaningless
                // for stacked traffic over an airport.
                continue;
            };

            let distance_nm = haversine_nm(lat_a, lon_a, lat_b, lon_b);
            if distance_nm > thresholds.proximity_nm {
                continue;
            }
            let alt_diff = (alt_a - alt_b).abs();
            if alt_diff > thresholds.altitude_diff_ft {
                continue;
            }

            let key = SafetyKey {
                kind: EventKind::ProximityConflict,
                subject: Subject::pair(&a.icao_hex, &b.icao_hex),
            };
            let window = Duration::seconds(thresholds.cooldowns.proximity_secs as i64);
            if !self.cooldowns.try_fire(key, window, now) {
                debug!(a = %a.icao_hex, b = %b.icao_hex, "proximity pair in cooldown");
                continue;
            }

            let severity = if distance_nm <= thresholds.proximity_nm / 2.0
                || alt_diff <= thresholds.altitude_diff_ft / 2
            {
                Severity::Critical
            } else {
                Severity::Warning
            };

            events.push(Event::pair(
                EventKind::ProximityConflict,
                severity,
                a.clone(),
                b.clone(),
                format!(
                    "{} and {} separated by {:.2} nm / {} ft",
                    a.icao_hex, b.icao_hex, distance_nm, alt_diff
                ),
                json!({
                    "distance_nm": distance_nm,
                    "altitude_diff_ft": alt_diff,
                    "proximity_threshold_nm": thresholds.proximity_nm,
                    "altitude_threshold_ft": thresholds.altitude_diff_ft,
                }),
                now,
            ));
        }
    }

    /// Number of live cooldown entries, for status reporting.
    pub fn cooldown_entries(&self) -> usize {
        self.cooldowns.len()
    }
}

impl Default for SafetyDetector {
    fn default() -> Self {
        Self::new()
    }
}
