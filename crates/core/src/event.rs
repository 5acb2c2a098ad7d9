//! Detection events and alert matches produced by the scan pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::snapshot::AircraftSnapshot;

/// What produced an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Sustained extreme climb/descent rate.
    ExtremeVs,
    /// Abrupt vertical-rate reversal resembling a TCAS resolution advisory.
    TcasRaLike,
    /// Two aircraft inside both the lateral and vertical separation limits.
    ProximityConflict,
    /// A user-defined alert rule matched.
    RuleAlert,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ExtremeVs => "extreme_vs",
            EventKind::TcasRaLike => "tcas_ra_like",
            EventKind::ProximityConflict => "proximity_conflict",
            EventKind::RuleAlert => "rule_alert",
        }
    }
}

/// Event severity, ordered `Info < Warning < Critical`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

/// A detection event, append-only once emitted.
///
/// Carries the triggering snapshot(s) verbatim so downstream consumers
/// never have to re-query track state that may have rotated since.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub kind: EventKind,
    pub severity: Severity,
    /// Primary aircraft.
    pub icao_hex: String,
    /// Second aircraft for pairwise events (proximity conflicts).
    #[serde(default)]
    pub other_icao: Option<String>,
    pub message: String,
    /// Structured detector- or rule-specific payload.
    pub details: serde_json::Value,
    pub snapshot: AircraftSnapshot,
    #[serde(default)]
    pub other_snapshot: Option<AircraftSnapshot>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Event concerning a single aircraft.
    pub fn single(
        kind: EventKind,
        severity: Severity,
        snapshot: AircraftSnapshot,
        message: impl Into<String>,
        details: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            icao_hex: snapshot.icao_hex.clone(),
            other_icao: None,
            message: message.into(),
            details,
            snapshot,
            other_snapshot: None,
            timestamp,
        }
    }

    /// Event concerning an aircraft pair.
    pub fn pair(
        kind: EventKind,
        severity: Severity,
        a: AircraftSnapshot,
        b: AircraftSnapshot,
        message: impl Into<String>,
        details: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            icao_hex: a.icao_hex.clone(),
            other_icao: Some(b.icao_hex.clone()),
            message: message.into(),
            details,
            snapshot: a,
            other_snapshot: Some(b),
            timestamp,
        }
    }

    /// Stable dedup subject: single icao, or the sorted icao pair.
    pub fn subject(&self) -> String {
        match &self.other_icao {
            Some(other) => {
                let (lo, hi) = if self.icao_hex <= *other {
                    (&self.icao_hex, other)
                } else {
                    (other, &self.icao_hex)
                };
                format!("{}:{}", lo, hi)
            }
            None => self.icao_hex.clone(),
        }
    }
}

/// One rule firing against one aircraft in one tick.
///
/// Multiple rules may independently match the same aircraft in the same
/// tick; matches are never deduplicated across rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertMatch {
    pub rule_id: u64,
    pub rule_name: String,
    pub priority: Severity,
    pub snapshot: AircraftSnapshot,
    /// Human-readable descriptions of the conditions that matched.
    pub matched_conditions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl AlertMatch {
    /// Convert into the event form the sink understands.
    pub fn into_event(self) -> Event {
        let details = serde_json::json!({
            "rule_id": self.rule_id,
            "rule_name": self.rule_name,
            "matched_conditions": self.matched_conditions,
        });
        let message = format!(
            "rule '{}' matched {}",
            self.rule_name, self.snapshot.icao_hex
        );
        Event::single(
            EventKind::RuleAlert,
            self.priority,
            self.snapshot,
            message,
            details,
            self.timestamp,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snap(icao: &str) -> AircraftSnapshot {
        AircraftSnapshot {
            icao_hex: icao.to_string(),
            callsign: None,
            lat: Some(50.0),
            lon: Some(8.0),
            altitude_baro: Some(10_000),
            vertical_rate: Some(0),
            ground_speed: Some(250.0),
            track: None,
            squawk: None,
            military: false,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
    }

    #[test]
    fn pair_subject_is_order_independent() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let e1 = Event::pair(
            EventKind::ProximityConflict,
            Severity::Critical,
            snap("bbb"),
            snap("aaa"),
            "close",
            serde_json::json!({}),
            ts,
        );
        let e2 = Event::pair(
            EventKind::ProximityConflict,
            Severity::Critical,
            snap("aaa"),
            snap("bbb"),
            "close",
            serde_json::json!({}),
            ts,
        );
        assert_eq!(e1.subject(), e2.subject());
        assert_eq!(e1.subject(), "aaa:bbb");
    }

    #[test]
    fn alert_match_converts_to_rule_alert_event() {
        let m = AlertMatch {
            rule_id: 7,
            rule_name: "low military".to_string(),
            priority: Severity::Warning,
            snapshot: snap("ae01ce"),
            matched_conditions: vec!["altitude < 5000".to_string()],
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        };
        let event = m.into_event();
        assert_eq!(event.kind, EventKind::RuleAlert);
        assert_eq!(event.severity, Severity::Warning);
        assert_eq!(event.icao_hex, "ae01ce");
        assert_eq!(event.details["rule_id"], 7);
    }
}
