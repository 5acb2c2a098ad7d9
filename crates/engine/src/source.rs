//! Snapshot source seam: where each tick's batch comes from.

use std::collections::VecDeque;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use skywarden_core::SnapshotBatch;

/// Errors from the upstream position poller.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("snapshot source unavailable: {0}")]
    Unavailable(String),

    #[error("snapshot decode failed: {0}")]
    Decode(String),
}

/// Delivers one aircraft-snapshot batch per tick.
///
/// The poller itself is an external collaborator; implementations here
/// only adapt whatever it already produces.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<SnapshotBatch, SourceError>;
}

/// Reads the poller's aircraft JSON file fresh on every fetch.
///
/// The standard ground-station setup has the receiver process rewrite
/// one JSON document with every aircraft it currently sees; polling
/// that file is the cheapest integration there is.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SnapshotSource for JsonFileSource {
    async fn fetch(&self) -> Result<SnapshotBatch, SourceError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&contents).map_err(|e| SourceError::Decode(e.to_string()))
    }
}

/// Scripted source for tests: yields queued batches in order, then
/// empty batches.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    batches: Mutex<VecDeque<SnapshotBatch>>,
}

impl ScriptedSource {
    pub fn new(batches: Vec<SnapshotBatch>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
        }
    }

    pub async fn push(&self, batch: SnapshotBatch) {
        self.batches.lock().await.push_back(batch);
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch(&self) -> Result<SnapshotBatch, SourceError> {
        Ok(self.batches.lock().await.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_file_source_reads_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aircraft.json");
        std::fs::write(
            &path,
            r#"[{"hex": "ae01ce", "alt_baro": 33000, "timestamp": "2025-06-01T12:00:00Z"}]"#,
        )
        .unwrap();

        let source = JsonFileSource::new(path);
        let batch = source.fetch().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].icao_hex, "ae01ce");
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let source = JsonFileSource::new(PathBuf::from("/nonexistent/aircraft.json"));
        assert!(matches!(
            source.fetch().await,
            Err(SourceError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn scripted_source_drains_then_empties() {
        let source = ScriptedSource::new(vec![vec![], vec![]]);
        assert!(source.fetch().await.unwrap().is_empty());
        assert!(source.fetch().await.unwrap().is_empty());
        // Past the script: still succeeds, still empty.
        assert!(source.fetch().await.unwrap().is_empty());
    }
}
