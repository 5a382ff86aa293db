// Queue Item Domain Model

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Session identifier (UUID v4 unless supplied)
pub type SessionId = String;

/// Caller-supplied metadata, opaque to the queue
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A single file-transfer work item
///
/// Field names on the wire follow the state file format
/// (`size`, `lastWriteTimeUtc`, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    source_path: PathBuf,
    pub target_path: Option<PathBuf>,
    #[serde(rename = "size")]
    pub size_bytes: Option<u64>,
    #[serde(rename = "lastWriteTimeUtc")]
    pub last_modified_utc: Option<DateTime<Utc>>,
    pub queued_at_utc: DateTime<Utc>,
    pub session_id: SessionId,
    attempts: u32,
    pub metadata: Metadata,
}

impl QueueItem {
    /// Create a new item with explicit queued-at timestamp
    ///
    /// The session is left empty; it is stamped by `FileQueue::enqueue`.
    pub fn new(source_path: impl Into<PathBuf>, queued_at_utc: DateTime<Utc>) -> Self {
        Self {
            source_path: source_path.into(),
            target_path: None,
            size_bytes: None,
            last_modified_utc: None,
            queued_at_utc,
            session_id: SessionId::new(),
            attempts: 0,
            metadata: Metadata::new(),
        }
    }

    pub fn with_target(mut self, target_path: impl Into<PathBuf>) -> Self {
        self.target_path = Some(target_path.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_file_info(mut self, size_bytes: u64, last_modified_utc: DateTime<Utc>) -> Self {
        self.size_bytes = Some(size_bytes);
        self.last_modified_utc = Some(last_modified_utc);
        self
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Number of times this item has been dequeued for processing
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    pub(crate) fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}
