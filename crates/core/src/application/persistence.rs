// Queue persistence: JSON snapshot / restore
use crate::domain::queue::DEFAULT_MAX_SIZE;
use crate::domain::{DomainError, FileQueue, Metadata, QueueConfig, QueueItem, SessionId};
use crate::port::{FileSystem, IdProvider, TimeProvider};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("No state path given and queue '{0}' has no default state path")]
    NoPath(String),

    #[error("State file already exists: {} (overwrite not allowed)", .0.display())]
    AlreadyExists(PathBuf),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed state file {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid queue in state file {}: {source}", .path.display())]
    InvalidQueue {
        path: PathBuf,
        #[source]
        source: DomainError,
    },

    #[error("Failed to encode queue '{name}': {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of loading items from a state file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub skipped: usize,
}

/// On-disk layout written by `save`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueueSnapshot<'a> {
    name: &'a str,
    session_id: &'a str,
    created: DateTime<Utc>,
    saved_at: DateTime<Utc>,
    processed: u64,
    failed: u64,
    max_size: i64,
    item_count: usize,
    items: Vec<&'a QueueItem>,
}

/// Tolerant read-side view of the state file
///
/// Top-level fields stay raw so a single bad value falls back to its
/// default instead of failing the whole restore.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedQueue {
    name: Option<serde_json::Value>,
    session_id: Option<serde_json::Value>,
    created: Option<serde_json::Value>,
    processed: Option<serde_json::Value>,
    failed: Option<serde_json::Value>,
    max_size: Option<serde_json::Value>,
    items: Option<serde_json::Value>,
}

impl PersistedQueue {
    fn items(&mut self) -> Vec<serde_json::Value> {
        lenient::<Vec<serde_json::Value>>("items", self.items.take()).unwrap_or_default()
    }
}

/// Decode an optional field, logging and dropping a value of the wrong shape
fn lenient<T: DeserializeOwned>(field: &str, value: Option<serde_json::Value>) -> Option<T> {
    match value {
        None | Some(serde_json::Value::Null) => None,
        Some(raw) => match serde_json::from_value(raw) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(field = field, error = %e, "Ignoring invalid state field, using default");
                None
            }
        },
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedItem {
    source_path: Option<PathBuf>,
    target_path: Option<PathBuf>,
    size: Option<u64>,
    last_write_time_utc: Option<DateTime<Utc>>,
    queued_at_utc: Option<DateTime<Utc>>,
    session_id: Option<SessionId>,
    attempts: Option<u32>,
    metadata: Option<Metadata>,
}

/// Saves and restores queues through the `FileSystem` port
pub struct QueueStore {
    fs: Arc<dyn FileSystem>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
}

impl QueueStore {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            fs,
            time_provider,
            id_provider,
        }
    }

    /// Write `queue` to `path` (or its default state path)
    ///
    /// Serializes from a shared borrow of the live items, so the queue
    /// itself is never drained. Failures are logged and returned; the
    /// queue is unaffected either way.
    ///
    /// Returns the path that was written.
    pub async fn save(
        &self,
        queue: &FileQueue,
        path: Option<&Path>,
        overwrite: bool,
    ) -> Result<PathBuf, PersistenceError> {
        let result = self.save_inner(queue, path, overwrite).await;
        match &result {
            Ok(written) => info!(
                queue = %queue.name(),
                path = %written.display(),
                items = queue.len(),
                "Queue state saved"
            ),
            Err(e) => error!(queue = %queue.name(), error = %e, "Failed to save queue state"),
        }
        result
    }

    async fn save_inner(
        &self,
        queue: &FileQueue,
        path: Option<&Path>,
        overwrite: bool,
    ) -> Result<PathBuf, PersistenceError> {
        let path = path
            .or_else(|| queue.state_path())
            .ok_or_else(|| PersistenceError::NoPath(queue.name().to_string()))?
            .to_path_buf();

        if !overwrite && self.fs.exists(&path).await {
            return Err(PersistenceError::AlreadyExists(path));
        }

        let items: Vec<&QueueItem> = queue.iter().collect();
        let snapshot = QueueSnapshot {
            name: queue.name(),
            session_id: queue.session_id(),
            created: queue.created_utc(),
            saved_at: self.time_provider.now(),
            processed: queue.processed_count,
            failed: queue.failed_count,
            max_size: queue.capacity().as_max_size(),
            item_count: items.len(),
            items,
        };

        let encoded =
            serde_json::to_vec_pretty(&snapshot).map_err(|source| PersistenceError::Encode {
                name: queue.name().to_string(),
                source,
            })?;

        self.fs
            .write_atomic(&path, &encoded)
            .await
            .map_err(|source| PersistenceError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }

    /// Rebuild a queue from a state file
    ///
    /// Returns `Ok(None)` if the file does not exist. Name, session, capacity,
    /// counters and creation time come from the file; the file becomes the
    /// queue's default state path.
    pub async fn restore(&self, path: &Path) -> Result<Option<FileQueue>, PersistenceError> {
        let Some(mut persisted) = self.read(path).await? else {
            return Ok(None);
        };

        let name = lenient::<String>("name", persisted.name.take())
            .filter(|n| !n.trim().is_empty())
            .or_else(|| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "restored".to_string());
        let session_id = lenient::<String>("sessionId", persisted.session_id.take())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.id_provider.generate_id());
        let created = lenient::<DateTime<Utc>>("created", persisted.created.take())
            .unwrap_or_else(|| self.time_provider.now());

        let config = QueueConfig::new(name)
            .with_max_size(
                lenient::<i64>("maxSize", persisted.max_size.take()).unwrap_or(DEFAULT_MAX_SIZE),
            )
            .with_state_path(path);
        let mut queue = FileQueue::new(config, session_id, created).map_err(|source| {
            error!(path = %path.display(), error = %source, "State file describes an invalid queue");
            PersistenceError::InvalidQueue {
                path: path.to_path_buf(),
                source,
            }
        })?;
        queue.processed_count = lenient("processed", persisted.processed.take()).unwrap_or(0);
        queue.failed_count = lenient("failed", persisted.failed.take()).unwrap_or(0);

        let items = persisted.items();
        let report = self.load_items(&mut queue, items);
        info!(
            queue = %queue.name(),
            path = %path.display(),
            restored = report.restored,
            skipped = report.skipped,
            "Queue restored"
        );

        Ok(Some(queue))
    }

    /// Load the items of a state file into an existing queue
    ///
    /// With `merge = false` the queue is cleared first (only once the file
    /// has parsed); with `merge = true` restored items follow the existing
    /// ones. The target queue keeps its own name, session and counters.
    pub async fn restore_into(
        &self,
        path: &Path,
        queue: &mut FileQueue,
        merge: bool,
    ) -> Result<Option<RestoreReport>, PersistenceError> {
        let Some(mut persisted) = self.read(path).await? else {
            return Ok(None);
        };

        if !merge {
            queue.clear();
        }
        let items = persisted.items();
        let report = self.load_items(queue, items);
        info!(
            queue = %queue.name(),
            path = %path.display(),
            merge = merge,
            restored = report.restored,
            skipped = report.skipped,
            "Queue items restored"
        );

        Ok(Some(report))
    }

    async fn read(&self, path: &Path) -> Result<Option<PersistedQueue>, PersistenceError> {
        if !self.fs.exists(path).await {
            warn!(path = %path.display(), "State file not found, nothing to restore");
            return Ok(None);
        }

        let raw = self.fs.read_to_string(path).await.map_err(|source| {
            error!(path = %path.display(), error = %source, "Failed to read state file");
            PersistenceError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;

        serde_json::from_str(&raw).map(Some).map_err(|source| {
            error!(path = %path.display(), error = %source, "State file is not valid queue JSON");
            PersistenceError::Malformed {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Normalize and append items; bad items are skipped, never fatal
    fn load_items(&self, queue: &mut FileQueue, raw_items: Vec<serde_json::Value>) -> RestoreReport {
        let now = self.time_provider.now();
        let mut report = RestoreReport::default();

        for (index, raw) in raw_items.into_iter().enumerate() {
            let persisted: PersistedItem = match serde_json::from_value(raw) {
                Ok(item) => item,
                Err(e) => {
                    warn!(index = index, error = %e, "Skipping malformed queue item");
                    report.skipped += 1;
                    continue;
                }
            };

            let Some(source_path) = persisted
                .source_path
                .filter(|p| !p.as_os_str().is_empty())
            else {
                warn!(index = index, "Skipping queue item without sourcePath");
                report.skipped += 1;
                continue;
            };

            let mut item = QueueItem::new(source_path, persisted.queued_at_utc.unwrap_or(now))
                .with_metadata(persisted.metadata.unwrap_or_default())
                .with_attempts(persisted.attempts.unwrap_or(0));
            item.target_path = persisted.target_path;
            item.size_bytes = persisted.size;
            item.last_modified_utc = persisted.last_write_time_utc;
            item.session_id = persisted.session_id.unwrap_or_default();

            if let Err(e) = queue.push_restored(item) {
                warn!(index = index, error = %e, "Skipping queue item that does not fit");
                report.skipped += 1;
                continue;
            }
            report.restored += 1;
        }

        report
    }
}
