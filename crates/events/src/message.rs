//! Wire envelope for the live-broadcast topic.
//!
//! Payloads are MessagePack for compact transport; the topic string is
//! what subscribers filter on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::traits::SinkError;

/// One broadcast frame: a topic plus an encoded payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Routing topic (see [`crate::topics`]).
    pub topic: String,
    /// MessagePack-encoded payload.
    pub payload: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    /// Correlates a frame with the event or tick that produced it.
    pub correlation_id: Uuid,
}

impl Message {
    /// Encode a payload under a topic.
    pub fn encode<T: Serialize>(topic: impl Into<String>, payload: &T) -> Result<Self, SinkError> {
        Ok(Self {
            topic: topic.into(),
            payload: rmp_serde::to_vec(payload).map_err(|e| SinkError::Encode(e.to_string()))?,
            timestamp: Utc::now(),
            correlation_id: Uuid::new_v4(),
        })
    }

    /// Decode the payload into the expected type.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, SinkError> {
        rmp_serde::from_slice(&self.payload).map_err(|e| SinkError::Encode(e.to_string()))
    }
}
