//! Aircraft snapshot types delivered by the external position poller.
//!
//! One batch of [`AircraftSnapshot`]s arrives per tick. Snapshots are
//! immutable; the next snapshot for the same `icao_hex` supersedes the
//! previous one in the state store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One timestamped position/state report for a single aircraft.
///
/// Field renames follow the poller wire format (`hex`, `alt_baro`, `gs`,
/// `baro_rate`). Everything except the ICAO address and the timestamp is
/// optional; weak receivers routinely deliver partial reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AircraftSnapshot {
    /// ICAO 24-bit address as a lowercase hex string.
    #[serde(rename = "hex")]
    pub icao_hex: String,

    #[serde(default)]
    pub callsign: Option<String>,

    #[serde(default)]
    pub lat: Option<f64>,

    #[serde(default)]
    pub lon: Option<f64>,

    /// Barometric altitude in feet.
    #[serde(default, rename = "alt_baro")]
    pub altitude_baro: Option<i32>,

    /// Vertical rate in feet per minute (positive = climbing).
    #[serde(default, rename = "baro_rate")]
    pub vertical_rate: Option<i32>,

    /// Ground speed in knots.
    #[serde(default, rename = "gs")]
    pub ground_speed: Option<f64>,

    /// True track in degrees.
    #[serde(default)]
    pub track: Option<f64>,

    #[serde(default)]
    pub squawk: Option<String>,

    #[serde(default)]
    pub military: bool,

    pub timestamp: DateTime<Utc>,
}

impl AircraftSnapshot {
    /// Check structural validity of a snapshot.
    ///
    /// A failing snapshot is skipped for the tick; it never aborts the
    /// scan of the rest of the batch.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.icao_hex.trim().is_empty() {
            return Err(CoreError::InvalidSnapshot("empty icao_hex".to_string()));
        }
        if let Some(lat) = self.lat {
            if !(-90.0..=90.0).contains(&lat) || !lat.is_finite() {
                return Err(CoreError::InvalidSnapshot(format!(
                    "latitude {} out of range for {}",
                    lat, self.icao_hex
                )));
            }
        }
        if let Some(lon) = self.lon {
            if !(-180.0..=180.0).contains(&lon) || !lon.is_finite() {
                return Err(CoreError::InvalidSnapshot(format!(
                    "longitude {} out of range for {}",
                    lon, self.icao_hex
                )));
            }
        }
        Ok(())
    }

    /// Both coordinates present.
    pub fn has_position(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }

    /// `(lat, lon)` when both coordinates are present.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Callsign with padding stripped, `None` when empty.
    pub fn trimmed_callsign(&self) -> Option<&str> {
        self.callsign
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// One poller delivery: every aircraft the upstream source currently sees.
pub type SnapshotBatch = Vec<AircraftSnapshot>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn deserializes_poller_wire_names() {
        let raw = r#"{
            "hex": "ae01ce",
            "callsign": "RCH285  ",
            "lat": 51.47,
            "lon": -0.45,
            "alt_baro": 33000,
            "baro_rate": -640,
            "gs": 447.2,
            "track": 271.5,
            "squawk": "3414",
            "military": true,
            "timestamp": "2025-06-01T12:00:00Z"
        }"#;

        let snap: AircraftSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snap.icao_hex, "ae01ce");
        assert_eq!(snap.altitude_baro, Some(33000));
        assert_eq!(snap.vertical_rate, Some(-640));
        assert_eq!(snap.ground_speed, Some(447.2));
        assert!(snap.military);
        assert_eq!(snap.trimmed_callsign(), Some("RCH285"));
    }

    #[test]
    fn partial_report_is_valid() {
        let raw = r#"{"hex": "4ca7b6", "timestamp": "2025-06-01T12:00:00Z"}"#;
        let snap: AircraftSnapshot = serde_json::from_str(raw).unwrap();
        assert!(snap.validate().is_ok());
        assert!(!snap.has_position());
        assert_eq!(snap.position(), None);
    }

    #[test]
    fn rejects_empty_icao() {
        let snap = AircraftSnapshot {
            icao_hex: "  ".to_string(),
            callsign: None,
            lat: None,
            lon: None,
            altitude_baro: None,
            vertical_rate: None,
            ground_speed: None,
            track: None,
            squawk: None,
            military: false,
            timestamp: ts(),
        };
        assert!(snap.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut snap = AircraftSnapshot {
            icao_hex: "abc123".to_string(),
            callsign: None,
            lat: Some(91.0),
            lon: Some(0.0),
            altitude_baro: None,
            vertical_rate: None,
            ground_speed: None,
            track: None,
            squawk: None,
            military: false,
            timestamp: ts(),
        };
        assert!(snap.validate().is_err());

        snap.lat = Some(45.0);
        snap.lon = Some(-181.0);
        assert!(snap.validate().is_err());

        snap.lon = Some(-180.0);
        assert!(snap.validate().is_ok());
    }
}
