//! The event sink: every detection event funnels through here.
//!
//! Order per event: duplicate suppression, append-only persistence,
//! then best-effort fan-out to the broadcast publisher and the
//! notification dispatcher. A failing collaborator is logged and
//! counted; it never blocks the event from reaching the others and
//! never fails the caller's tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use skywarden_core::{CooldownLedger, Event, EventKind};

use crate::message::Message;
use crate::topics;
use crate::traits::{EventPublisher, HistoryStore, NotificationDispatcher};

/// Outcome of one `emit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitStatus {
    Emitted,
    /// Exact duplicate inside the dedup window; nothing persisted.
    Deduplicated,
}

/// Monotonic fan-out counters, exposed through the status query.
#[derive(Debug, Default)]
pub struct SinkCounters {
    pub emitted: AtomicU64,
    pub deduplicated: AtomicU64,
    pub persist_failures: AtomicU64,
    pub publish_failures: AtomicU64,
    pub dispatch_failures: AtomicU64,
}

impl SinkCounters {
    pub fn snapshot(&self) -> SinkCountersSnapshot {
        SinkCountersSnapshot {
            emitted: self.emitted.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
        }
    }
}

/// Plain-data view of [`SinkCounters`].
#[derive(Debug, Clone, Copy, serde::Serialize, PartialEq, Eq)]
pub struct SinkCountersSnapshot {
    pub emitted: u64,
    pub deduplicated: u64,
    pub persist_failures: u64,
    pub publish_failures: u64,
    pub dispatch_failures: u64,
}

/// Dedups, persists, and fans out emitted events.
pub struct EventSink {
    history: Arc<dyn HistoryStore>,
    publisher: Arc<dyn EventPublisher>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    dedup: Mutex<CooldownLedger<(EventKind, String)>>,
    dedup_window: Duration,
    counters: SinkCounters,
}

impl EventSink {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        publisher: Arc<dyn EventPublisher>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        dedup_window: Duration,
    ) -> Self {
        Self {
            history,
            publisher,
            dispatcher,
            dedup: Mutex::new(CooldownLedger::new()),
            dedup_window,
            counters: SinkCounters::default(),
        }
    }

    /// Emit one event. Infallible by contract: downstream failures are
    /// absorbed here so no emission can abort a tick.
    pub async fn emit(&self, event: Event) -> EmitStatus {
        // The detectors' cooldown ledgers are the real flood control;
        // this window only collapses exact same-subject repeats, e.g.
        // from overlapping scans.
        {
            let mut dedup = self.dedup.lock().await;
            if !dedup.try_fire(
                (event.kind, event.subject()),
                self.dedup_window,
                event.timestamp,
            ) {
                debug!(kind = event.kind.as_str(), subject = %event.subject(), "duplicate event suppressed");
                self.counters.deduplicated.fetch_add(1, Ordering::Relaxed);
                return EmitStatus::Deduplicated;
            }
        }

        if let Err(e) = self.history.append(&event).await {
            warn!(error = %e, event_id = %event.id, "event history append failed");
            self.counters.persist_failures.fetch_add(1, Ordering::Relaxed);
        }

        let topic = match event.kind {
            EventKind::RuleAlert => topics::EVENT_RULE,
            _ => topics::EVENT_SAFETY,
        };
        match Message::encode(topic, &event) {
            Ok(message) => {
                if let Err(e) = self.publisher.publish(message).await {
                    warn!(error = %e, event_id = %event.id, "broadcast publish failed");
                    self.counters.publish_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(e) => {
                warn!(error = %e, event_id = %event.id, "event encode failed");
                self.counters.publish_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Err(e) = self.dispatcher.dispatch(&event).await {
            warn!(
                error = %e,
                dispatcher = self.dispatcher.name(),
                event_id = %event.id,
                "notification dispatch failed"
            );
            self.counters.dispatch_failures.fetch_add(1, Ordering::Relaxed);
        }

        self.counters.emitted.fetch_add(1, Ordering::Relaxed);
        EmitStatus::Emitted
    }

    pub fn counters(&self) -> SinkCountersSnapshot {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicUsize;

    use skywarden_core::{AircraftSnapshot, Severity};

    use crate::history::MemoryHistoryStore;
    use crate::traits::SinkError;

    struct CountingPublisher {
        published: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl EventPublisher for CountingPublisher {
        async fn publish(&self, _message: Message) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::Publish("socket closed".to_string()));
            }
            self.published.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingDispatcher {
        dispatched: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationDispatcher for CountingDispatcher {
        async fn dispatch(&self, _event: &Event) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::Dispatch("queue full".to_string()));
            }
            self.dispatched.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    fn event(icao: &str, secs: i64) -> Event {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(secs);
        let snapshot = AircraftSnapshot {
            icao_hex: icao.to_string(),
            callsign: None,
            lat: None,
            lon: None,
            altitude_baro: Some(10_000),
            vertical_rate: Some(-7_000),
            ground_speed: None,
            track: None,
            squawk: None,
            military: false,
            timestamp: ts,
        };
        Event::single(
            EventKind::ExtremeVs,
            Severity::Critical,
            snapshot,
            "descent",
            serde_json::json!({}),
            ts,
        )
    }

    fn sink_with(
        history: MemoryHistoryStore,
        publish_fail: bool,
        dispatch_fail: bool,
    ) -> (EventSink, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let published = Arc::new(AtomicUsize::new(0));
        let dispatched = Arc::new(AtomicUsize::new(0));
        let sink = EventSink::new(
            Arc::new(history),
            Arc::new(CountingPublisher {
                published: published.clone(),
                fail: publish_fail,
            }),
            Arc::new(CountingDispatcher {
                dispatched: dispatched.clone(),
                fail: dispatch_fail,
            }),
            Duration::seconds(2),
        );
        (sink, published, dispatched)
    }

    #[tokio::test]
    async fn emit_persists_and_fans_out() {
        let history = MemoryHistoryStore::new();
        let (sink, published, dispatched) = sink_with(history, false, false);

        assert_eq!(sink.emit(event("aaa111", 0)).await, EmitStatus::Emitted);
        assert_eq!(published.load(Ordering::SeqCst), 1);
        assert_eq!(dispatched.load(Ordering::SeqCst), 1);
        assert_eq!(sink.counters().emitted, 1);
    }

    #[tokio::test]
    async fn duplicate_inside_window_suppressed() {
        let (sink, published, _) = sink_with(MemoryHistoryStore::new(), false, false);

        assert_eq!(sink.emit(event("aaa111", 0)).await, EmitStatus::Emitted);
        assert_eq!(sink.emit(event("aaa111", 1)).await, EmitStatus::Deduplicated);
        // Outside the window it flows again.
        assert_eq!(sink.emit(event("aaa111", 5)).await, EmitStatus::Emitted);

        assert_eq!(published.load(Ordering::SeqCst), 2);
        assert_eq!(sink.counters().deduplicated, 1);
    }

    #[tokio::test]
    async fn publisher_failure_does_not_block_dispatch() {
        let (sink, _, dispatched) = sink_with(MemoryHistoryStore::new(), true, false);

        assert_eq!(sink.emit(event("aaa111", 0)).await, EmitStatus::Emitted);
        assert_eq!(dispatched.load(Ordering::SeqCst), 1);

        let counters = sink.counters();
        assert_eq!(counters.publish_failures, 1);
        assert_eq!(counters.emitted, 1);
    }

    #[tokio::test]
    async fn dispatch_failure_counted_never_retried() {
        let (sink, published, _) = sink_with(MemoryHistoryStore::new(), false, true);

        sink.emit(event("aaa111", 0)).await;
        sink.emit(event("bbb222", 0)).await;

        let counters = sink.counters();
        assert_eq!(counters.dispatch_failures, 2);
        assert_eq!(counters.emitted, 2);
        assert_eq!(published.load(Ordering::SeqCst), 2);
    }
}
