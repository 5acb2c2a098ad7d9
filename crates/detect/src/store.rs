//! Per-aircraft track state: rolling current + previous snapshot pair.
//!
//! The engine owns the store exclusively and applies a whole batch before
//! any detector runs, so a scan never observes a partially updated tick.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use skywarden_core::{AircraftSnapshot, SnapshotBatch};

/// Rolling state for one aircraft, keyed by `icao_hex` in the store.
#[derive(Debug, Clone)]
pub struct TrackState {
    pub current: AircraftSnapshot,
    pub previous: Option<AircraftSnapshot>,
    pub last_update: DateTime<Utc>,
}

impl TrackState {
    /// Previous and current vertical rates, when both snapshots carry one.
    pub fn vertical_rate_pair(&self) -> Option<(i32, i32)> {
        let prev = self.previous.as_ref()?.vertical_rate?;
        let curr = self.current.vertical_rate?;
        Some((prev, curr))
    }

    /// Seconds between the previous and current snapshot timestamps.
    pub fn snapshot_gap_secs(&self) -> Option<i64> {
        let prev = self.previous.as_ref()?;
        Some(
            self.current
                .timestamp
                .signed_duration_since(prev.timestamp)
                .num_seconds(),
        )
    }
}

/// Counts for one `update()` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub applied: usize,
    pub skipped: usize,
}

/// Holds the current + previous snapshot per aircraft.
///
/// One entry per `icao_hex`; entries idle past the session timeout are
/// dropped by [`evict`](AircraftStateStore::evict).
#[derive(Debug)]
pub struct AircraftStateStore {
    tracks: HashMap<String, TrackState>,
    session_timeout: Duration,
}

impl AircraftStateStore {
    pub fn new(session_timeout: Duration) -> Self {
        Self {
            tracks: HashMap::new(),
            session_timeout,
        }
    }

    /// Apply a whole snapshot batch: rotate current→previous, store the
    /// new current, refresh the update time. Invalid snapshots are
    /// skipped and counted, never aborting the rest of the batch.
    pub fn update(&mut self, batch: SnapshotBatch) -> UpdateStats {
        let mut stats = UpdateStats::default();

        for snapshot in batch {
            if let Err(e) = snapshot.validate() {
                debug!(error = %e, "skipping malformed snapshot");
                stats.skipped += 1;
                continue;
            }

            let now = snapshot.timestamp;
            match self.tracks.get_mut(&snapshot.icao_hex) {
                Some(track) => {
                    track.previous = Some(std::mem::replace(&mut track.current, snapshot));
                    track.last_update = now;
                }
                None => {
                    self.tracks.insert(
                        snapshot.icao_hex.clone(),
                        TrackState {
                            current: snapshot,
                            previous: None,
                            last_update: now,
                        },
                    );
                }
            }
            stats.applied += 1;
        }

        stats
    }

    /// Drop entries idle past the session timeout. Returns count removed.
    pub fn evict(&mut self, now: DateTime<Utc>) -> usize {
        let timeout = self.session_timeout;
        let before = self.tracks.len();
        self.tracks
            .retain(|_, track| now.signed_duration_since(track.last_update) < timeout);
        let removed = before - self.tracks.len();
        if removed > 0 {
            debug!(removed, remaining = self.tracks.len(), "evicted idle tracks");
        }
        removed
    }

    pub fn get(&self, icao_hex: &str) -> Option<&TrackState> {
        self.tracks.get(icao_hex)
    }

    /// All track states, unordered.
    pub fn tracks(&self) -> impl Iterator<Item = &TrackState> {
        self.tracks.values()
    }

    /// The current snapshot of every tracked aircraft, unordered.
    pub fn current_snapshots(&self) -> impl Iterator<Item = &AircraftSnapshot> {
        self.tracks.values().map(|t| &t.current)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snap(icao: &str, vr: Option<i32>, secs: i64) -> AircraftSnapshot {
        AircraftSnapshot {
            icao_hex: icao.to_string(),
            callsign: None,
            lat: Some(50.0),
            lon: Some(8.0),
            altitude_baro: Some(30_000),
            vertical_rate: vr,
            ground_speed: Some(400.0),
            track: None,
            squawk: None,
            military: false,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
                + Duration::seconds(secs),
        }
    }

    #[test]
    fn first_sighting_has_no_previous() {
        let mut store = AircraftStateStore::new(Duration::seconds(300));
        let stats = store.update(vec![snap("abc123", Some(0), 0)]);
        assert_eq!(stats, UpdateStats { applied: 1, skipped: 0 });

        let track = store.get("abc123").unwrap();
        assert!(track.previous.is_none());
        assert!(track.vertical_rate_pair().is_none());
    }

    #[test]
    fn second_batch_rotates_current_to_previous() {
        let mut store = AircraftStateStore::new(Duration::seconds(300));
        store.update(vec![snap("abc123", Some(-500), 0)]);
        store.update(vec![snap("abc123", Some(2000), 2)]);

        let track = store.get("abc123").unwrap();
        assert_eq!(track.vertical_rate_pair(), Some((-500, 2000)));
        assert_eq!(track.snapshot_gap_secs(), Some(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn malformed_snapshot_skipped_not_fatal() {
        let mut store = AircraftStateStore::new(Duration::seconds(300));
        let mut bad = snap("bad", None, 0);
        bad.lat = Some(200.0);

        let stats = store.update(vec![bad, snap("good", None, 0)]);
        assert_eq!(stats, UpdateStats { applied: 1, skipped: 1 });
        assert!(store.get("bad").is_none());
        assert!(store.get("good").is_some());
    }

    #[test]
    fn idle_tracks_evicted_after_timeout() {
        let mut store = AircraftStateStore::new(Duration::seconds(300));
        store.update(vec![snap("stale", None, 0), snap("fresh", None, 250)]);

        let now = snap("x", None, 301).timestamp;
        let removed = store.evict(now);
        assert_eq!(removed, 1);
        assert!(store.get("stale").is_none());
        assert!(store.get("fresh").is_some());
    }
}
