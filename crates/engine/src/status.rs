//! Engine status snapshot for the status query.

use serde::Serialize;

use skywarden_core::SafetyThresholds;
use skywarden_events::sink::SinkCountersSnapshot;
use skywarden_rules::CacheStatus;

/// Everything an operator needs to see at a glance.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub thresholds: SafetyThresholds,
    pub tracked_aircraft: usize,
    pub source_available: bool,
    pub cache: CacheStatus,
    pub sink: SinkCountersSnapshot,
    pub last_tick: Option<TickReport>,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct TickReport {
    pub applied: usize,
    pub skipped: usize,
    pub evicted: usize,
    pub safety_events: usize,
    pub alert_matches: usize,
    pub emitted: usize,
    pub deduplicated: usize,
}
