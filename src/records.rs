//! Flat JSON file of confirmed detection events.
//!
//! Every append reads the whole file, adds the event unless an entry with
//! the same `(emotion, timestamp)` already exists, and writes the file back.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;

use crate::vision::types::DetectionEvent;

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("record file io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("record file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RecordStore {
    /// Opens the record file, creating it as an empty list if missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RecordStoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        if tokio::fs::metadata(&path).await.is_err() {
            tokio::fs::write(&path, b"[]")
                .await
                .map_err(|e| io_error(&path, e))?;
            tracing::info!(path = %path.display(), "Created empty emotion record file");
        }

        let store = Self {
            path,
            write_lock: Mutex::new(()),
        };
        // 启动时校验文件格式，损坏即失败
        store.read_all().await?;
        Ok(store)
    }

    pub async fn list(&self) -> Result<Vec<DetectionEvent>, RecordStoreError> {
        self.read_all().await
    }

    /// Returns `true` when the event was written, `false` when an identical
    /// `(emotion, timestamp)` entry was already present.
    pub async fn append_if_absent(&self, event: &DetectionEvent) -> Result<bool, RecordStoreError> {
        let _guard = self.write_lock.lock().await;

        let mut events = self.read_all().await?;
        if events.iter().any(|existing| existing.same_key(event)) {
            tracing::debug!(emotion = %event.emotion, timestamp = %event.timestamp, "Duplicate detection skipped");
            return Ok(false);
        }
        events.push(event.clone());

        let bytes = serde_json::to_vec_pretty(&events)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;

        tracing::info!(
            emotion = %event.emotion,
            timestamp = %event.timestamp,
            confidence = event.confidence,
            "Detection persisted"
        );
        Ok(true)
    }

    async fn read_all(&self) -> Result<Vec<DetectionEvent>, RecordStoreError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&raw)?)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> RecordStoreError {
    RecordStoreError::Io {
        path: path.display().to_string(),
        source,
    }
}
