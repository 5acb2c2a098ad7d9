//! Event emission: persistence, live broadcast, notification dispatch.
//!
//! The [`sink::EventSink`] is the single funnel every detection event
//! passes through: exact-duplicate suppression, append-only history,
//! then best-effort fan-out to the broadcast and notification seams.
//! Downstream failures are counted and logged, never retried here;
//! retry policy belongs to the collaborator behind each seam.

pub mod broadcast;
pub mod history;
pub mod message;
pub mod sink;
pub mod topics;
pub mod traits;

pub use broadcast::BroadcastPublisher;
pub use history::{JsonlHistoryStore, MemoryHistoryStore};
pub use message::Message;
pub use sink::{EmitStatus, EventSink, SinkCounters};
pub use traits::{EventPublisher, HistoryStore, LogDispatcher, NotificationDispatcher, SinkError};
