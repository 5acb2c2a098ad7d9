//! Spatial bucket grid for pairwise proximity candidate generation.
//!
//! Aircraft with a position are bucketed into lat/lon cells sized so one
//! cell step covers at least the proximity radius (one arcminute of
//! latitude = one nautical mile). Longitude degrees shrink with latitude,
//! so the longitude neighborhood is widened by 1/cos(lat). The grid only
//! has to be conservative; the detector does the exact distance check.
//!
//! Rebuilt fresh every tick; average O(n) candidate generation instead of
//! the O(n²) all-pairs scan.

use std::collections::{HashMap, HashSet};

use skywarden_core::AircraftSnapshot;

/// Latitude above which the widening factor is clamped rather than blown
/// up toward the pole.
const MAX_ABS_LAT_DEG: f64 = 85.0;

/// Floor for the cell edge so a tiny radius never degenerates the grid.
const MIN_CELL_DEG: f64 = 0.01;

type CellKey = (i32, i32);

/// Grid of positioned aircraft for one tick.
#[derive(Debug)]
pub struct ProximityIndex {
    cells: HashMap<CellKey, Vec<usize>>,
    aircraft: Vec<AircraftSnapshot>,
    cell_deg: f64,
}

impl ProximityIndex {
    /// Bucket every positioned snapshot. Aircraft without both
    /// coordinates are left out entirely.
    pub fn build<'a>(
        snapshots: impl Iterator<Item = &'a AircraftSnapshot>,
        proximity_nm: f64,
    ) -> Self {
        let cell_deg = (proximity_nm / 60.0).max(MIN_CELL_DEG);

        let aircraft: Vec<AircraftSnapshot> = snapshots
            .filter(|s| s.has_position())
            .cloned()
            .collect();

        let mut cells: HashMap<CellKey, Vec<usize>> = HashMap::new();
        for (idx, snap) in aircraft.iter().enumerate() {
            let (lat, lon) = snap.position().expect("positioned by filter");
            cells.entry(cell_key(lat, lon, cell_deg)).or_default().push(idx);
        }

        Self {
            cells,
            aircraft,
            cell_deg,
        }
    }

    /// Number of positioned aircraft in the index.
    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    /// Aircraft in the same or a neighboring cell of the given position,
    /// excluding the aircraft itself by icao.
    pub fn candidates(&self, of: &AircraftSnapshot) -> Vec<&AircraftSnapshot> {
        let Some((lat, lon)) = of.position() else {
            return Vec::new();
        };
        self.neighbor_indices(lat, lon)
            .into_iter()
            .map(|i| &self.aircraft[i])
            .filter(|c| c.icao_hex != of.icao_hex)
            .collect()
    }

    /// Every candidate pair exactly once, lower icao first.
    ///
    /// The longitude widening depends on each aircraft's own latitude,
    /// so neighborhoods are not symmetric; pairs found from either side
    /// are deduplicated by index.
    pub fn candidate_pairs(&self) -> Vec<(&AircraftSnapshot, &AircraftSnapshot)> {
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut pairs = Vec::new();
        for (i, snap) in self.aircraft.iter().enumerate() {
            let (lat, lon) = snap.position().expect("positioned by construction");
            for j in self.neighbor_indices(lat, lon) {
                if j == i || !seen.insert((i.min(j), i.max(j))) {
                    continue;
                }
                let other = &self.aircraft[j];
                if snap.icao_hex <= other.icao_hex {
                    pairs.push((snap, other));
                } else {
                    pairs.push((other, snap));
                }
            }
        }
        pairs
    }

    /// Indices of all aircraft in the 3×(2w+1) neighborhood around a
    /// position, where `w` widens with latitude.
    fn neighbor_indices(&self, lat: f64, lon: f64) -> Vec<usize> {
        let (cell_lat, cell_lon) = cell_key(lat, lon, self.cell_deg);
        let w = lon_widening(lat, self.cell_deg);

        let mut found = Vec::new();
        for dlat in -1..=1 {
            for dlon in -w..=w {
                if let Some(bucket) = self.cells.get(&(cell_lat + dlat, cell_lon + dlon)) {
                    found.extend_from_slice(bucket);
                }
            }
        }
        found
    }
}

fn cell_key(lat: f64, lon: f64, cell_deg: f64) -> CellKey {
    (
        (lat / cell_deg).floor() as i32,
        (lon / cell_deg).floor() as i32,
    )
}

/// How many longitude cells one latitude cell's worth of distance spans.
fn lon_widening(lat: f64, cell_deg: f64) -> i32 {
    let abs_lat = (lat.abs() + cell_deg).min(MAX_ABS_LAT_DEG);
    (1.0 / abs_lat.to_radians().cos()).ceil() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::haversine_nm;
    use chrono::{TimeZone, Utc};

    fn snap(icao: &str, lat: f64, lon: f64) -> AircraftSnapshot {
        AircraftSnapshot {
            icao_hex: icao.to_string(),
            callsign: None,
            lat: Some(lat),
            lon: Some(lon),
            altitude_baro: Some(30_000),
            vertical_rate: None,
            ground_speed: None,
            track: None,
            squawk: None,
            military: false,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn close_pair_is_candidate() {
        // 0.4 nm apart in latitude.
        let a = snap("aaa", 50.0, 8.0);
        let b = snap("bbb", 50.0 + 0.4 / 60.0, 8.0);
        let index = ProximityIndex::build([a, b].iter(), 1.0);

        let pairs = index.candidate_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.icao_hex, "aaa");
        assert_eq!(pairs[0].1.icao_hex, "bbb");
    }

    #[test]
    fn distant_aircraft_never_paired() {
        let a = snap("aaa", 50.0, 8.0);
        let b = snap("bbb", 52.0, 8.0); // 120 nm away
        let index = ProximityIndex::build([a, b].iter(), 1.0);
        assert!(index.candidate_pairs().is_empty());
    }

    #[test]
    fn unpositioned_aircraft_excluded() {
        let a = snap("aaa", 50.0, 8.0);
        let mut b = snap("bbb", 50.0, 8.0);
        b.lat = None;
        let index = ProximityIndex::build([a, b].iter(), 1.0);
        assert_eq!(index.len(), 1);
        assert!(index.candidate_pairs().is_empty());
    }

    #[test]
    fn each_pair_reported_once() {
        // Three aircraft in one cell -> exactly the 3 unordered pairs.
        let snaps = vec![
            snap("aaa", 50.0, 8.0),
            snap("bbb", 50.001, 8.0),
            snap("ccc", 50.0, 8.001),
        ];
        let index = ProximityIndex::build(snaps.iter(), 1.0);
        let pairs = index.candidate_pairs();
        assert_eq!(pairs.len(), 3);
        for (a, b) in pairs {
            assert!(a.icao_hex < b.icao_hex);
        }
    }

    #[test]
    fn high_latitude_neighbors_not_missed() {
        // At 80°N a degree of longitude is ~10.4 nm, so two aircraft
        // 0.9 nm apart sit several base-width cells apart in longitude.
        let lon_step = 0.9 / (60.0 * 80.0_f64.to_radians().cos());
        let a = snap("aaa", 80.0, 8.0);
        let b = snap("bbb", 80.0, 8.0 + lon_step);
        assert!(haversine_nm(80.0, 8.0, 80.0, 8.0 + lon_step) < 1.0);

        let index = ProximityIndex::build([a, b].iter(), 1.0);
        assert_eq!(index.candidate_pairs().len(), 1);
    }

    #[test]
    fn candidates_excludes_self() {
        let a = snap("aaa", 50.0, 8.0);
        let b = snap("bbb", 50.001, 8.0);
        let index = ProximityIndex::build([a.clone(), b].iter(), 1.0);
        let cands = index.candidates(&a);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].icao_hex, "bbb");
    }
}
