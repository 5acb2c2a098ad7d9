//! In-process live-broadcast publisher over a tokio broadcast channel.
//!
//! Subscribers are websocket bridges, dashboards, or tests; a lagging
//! subscriber drops frames on its own receiver without affecting the
//! publisher or other subscribers.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::message::Message;
use crate::traits::{EventPublisher, SinkError};

pub struct BroadcastPublisher {
    sender: broadcast::Sender<Message>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// New subscription receiving frames published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, message: Message) -> Result<(), SinkError> {
        // No subscribers is the idle-dashboard case, not a failure.
        let _ = self.sender.send(message);
        Ok(())
    }
}
