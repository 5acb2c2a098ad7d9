//! The tick driver: one periodic loop running state update, safety
//! scan, and rule scan against one immutable batch.
//!
//! Sequencing inside a tick is strict: the whole batch is applied to
//! the state store before any detector runs, and no detector mutates
//! track state. Cancellation happens only between ticks; no emission
//! spans two ticks.

pub mod source;
pub mod status;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use skywarden_core::{SharedThresholds, SnapshotBatch};
use skywarden_detect::{AircraftStateStore, ProximityIndex, SafetyDetector};
use skywarden_events::{EmitStatus, EventSink};
use skywarden_rules::{CallerScope, RuleCache, RuleEvaluator};

pub use source::{JsonFileSource, ScriptedSource, SnapshotSource, SourceError};
pub use status::{EngineStatus, TickReport};

/// Knobs the engine itself needs (everything else lives with the
/// component it configures).
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub tick_interval_secs: u64,
    pub session_timeout_secs: u64,
    /// Fixed offset of deployment-local time from UTC, in minutes;
    /// drives suppression-window checks.
    pub local_offset_min: i32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: 2,
            session_timeout_secs: 300,
            local_offset_min: 0,
        }
    }
}

/// Owns the whole per-tick pipeline.
pub struct Engine {
    settings: EngineSettings,
    thresholds: SharedThresholds,
    source: Arc<dyn SnapshotSource>,
    cache: Arc<RuleCache>,
    sink: Arc<EventSink>,
    store: AircraftStateStore,
    detector: SafetyDetector,
    evaluator: RuleEvaluator,
    source_available: AtomicBool,
    last_tick: Option<TickReport>,
}

impl Engine {
    pub fn new(
        settings: EngineSettings,
        thresholds: SharedThresholds,
        source: Arc<dyn SnapshotSource>,
        cache: Arc<RuleCache>,
        sink: Arc<EventSink>,
    ) -> Self {
        let store = AircraftStateStore::new(Duration::seconds(settings.session_timeout_secs as i64));
        Self {
            settings,
            thresholds,
            source,
            cache,
            sink,
            store,
            detector: SafetyDetector::new(),
            evaluator: RuleEvaluator::new(),
            source_available: AtomicBool::new(true),
            last_tick: None,
        }
    }

    /// Run one tick at `now`. Always completes; individual failures
    /// downgrade to partial results, never to an aborted tick.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        let batch: SnapshotBatch = match self.source.fetch().await {
            Ok(batch) => {
                self.source_available.store(true, Ordering::Relaxed);
                batch
            }
            Err(e) => {
                // Surfaced as an availability flag; recovery is the
                // poller's problem. Eviction still runs so a dead feed
                // ages out instead of freezing the picture.
                warn!(error = %e, "snapshot source fetch failed");
                self.source_available.store(false, Ordering::Relaxed);
                report.evicted = self.store.evict(now);
                self.last_tick = Some(report);
                return report;
            }
        };

        let stats = self.store.update(batch);
        report.applied = stats.applied;
        report.skipped = stats.skipped;
        report.evicted = self.store.evict(now);

        // Thresholds are snapshotted once per tick so a hot reload can
        // never split one scan across two configurations.
        let thresholds = self.thresholds.get();

        let index = ProximityIndex::build(self.store.current_snapshots(), thresholds.proximity_nm);
        let safety_events = self
            .detector
            .scan(&self.store, &index, &thresholds, now);
        report.safety_events = safety_events.len();

        let rules = self.cache.get_active_rules(&CallerScope::System).await;
        let local_now =
            (now + Duration::minutes(self.settings.local_offset_min as i64)).naive_utc();
        let matches =
            self.evaluator
                .scan(self.store.current_snapshots(), &rules, now, local_now);
        report.alert_matches = matches.len();

        for event in safety_events {
            match self.sink.emit(event).await {
                EmitStatus::Emitted => report.emitted += 1,
                EmitStatus::Deduplicated => report.deduplicated += 1,
            }
        }
        for alert in matches {
            match self.sink.emit(alert.into_event()).await {
                EmitStatus::Emitted => report.emitted += 1,
                EmitStatus::Deduplicated => report.deduplicated += 1,
            }
        }

        debug!(
            applied = report.applied,
            skipped = report.skipped,
            evicted = report.evicted,
            safety = report.safety_events,
            alerts = report.alert_matches,
            emitted = report.emitted,
            "tick complete"
        );

        self.last_tick = Some(report);
        report
    }

    /// Drive the tick loop until `shutdown` is notified. Cancellation
    /// is between-tick only.
    pub async fn run(mut self, shutdown: Arc<Notify>) {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.settings.tick_interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            tick_interval_secs = self.settings.tick_interval_secs,
            "engine loop starting"
        );
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Utc::now()).await;
                }
                _ = shutdown.notified() => {
                    info!("engine loop shutting down");
                    break;
                }
            }
        }
    }

    /// Status query: thresholds, tracked count, source availability,
    /// cache health, sink counters, last tick.
    pub async fn status(&self) -> EngineStatus {
        EngineStatus {
            thresholds: self.thresholds.get(),
            tracked_aircraft: self.store.len(),
            source_available: self.source_available.load(Ordering::Relaxed),
            cache: self.cache.status().await,
            sink: self.sink.counters(),
            last_tick: self.last_tick,
        }
    }
}
