//! Collaborator seams for event fan-out and persistence.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use skywarden_core::Event;

use crate::message::Message;

/// Errors from the sink's collaborators.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("encode error: {0}")]
    Encode(String),

    #[error("history append failed: {0}")]
    Persist(String),

    #[error("broadcast failed: {0}")]
    Publish(String),

    #[error("notification dispatch failed: {0}")]
    Dispatch(String),
}

/// Publishes frames to the live-broadcast topic.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, message: Message) -> Result<(), SinkError>;
}

/// Blanket implementation so `Arc<dyn EventPublisher>` works directly.
#[async_trait]
impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    async fn publish(&self, message: Message) -> Result<(), SinkError> {
        (**self).publish(message).await
    }
}

/// Hands events to the external notification pipeline.
///
/// The dispatcher owns its own queueing and retry policy; the sink
/// calls it exactly once per event and moves on.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: &Event) -> Result<(), SinkError>;

    /// Human-readable name for logs and status.
    fn name(&self) -> &str;
}

/// Append-only event history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, event: &Event) -> Result<(), SinkError>;
}

/// Dispatcher that only logs. The deployment default until a real
/// notification pipeline is attached.
#[derive(Debug, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, event: &Event) -> Result<(), SinkError> {
        info!(
            kind = event.kind.as_str(),
            severity = ?event.severity,
            icao = %event.icao_hex,
            "notification: {}",
            event.message
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
