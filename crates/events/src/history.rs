//! Append-only event history stores.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use skywarden_core::Event;

use crate::traits::{HistoryStore, SinkError};

/// JSON-lines file store: one serialized event per line, append-only.
pub struct JsonlHistoryStore {
    path: PathBuf,
    // Serializes appends so concurrent emits never interleave lines.
    write_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    /// Create a store at `path`, creating parent directories if needed.
    pub fn new(path: PathBuf) -> Self {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    warn!(path = %parent.display(), error = %e, "failed to create history directory");
                }
            }
        }
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn append(&self, event: &Event) -> Result<(), SinkError> {
        let mut line =
            serde_json::to_vec(event).map_err(|e| SinkError::Encode(e.to_string()))?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| SinkError::Persist(e.to_string()))?;
        file.write_all(&line)
            .await
            .map_err(|e| SinkError::Persist(e.to_string()))?;
        Ok(())
    }
}

/// In-memory store for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    events: Mutex<Vec<Event>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, event: &Event) -> Result<(), SinkError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
