// Intake Use Cases - queue creation and validated file adds

use crate::domain::{DomainError, FileQueue, Metadata, QueueConfig, QueueItem, SessionId};
use crate::port::{FileSystem, IdProvider, TimeProvider};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Request to queue a single file
#[derive(Debug, Clone)]
pub struct AddFileRequest {
    pub source_path: PathBuf,
    pub target_path: Option<PathBuf>,
    pub metadata: Metadata,
    /// Reject the add if the source does not exist yet
    pub validate_file: bool,
}

impl AddFileRequest {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            target_path: None,
            metadata: Metadata::new(),
            validate_file: true,
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

    /// Allow queuing files that will only exist later
    pub fn without_validation(mut self) -> Self {
        self.validate_file = false;
        self
    }
}

/// Queue intake service
pub struct QueueService {
    fs: Arc<dyn FileSystem>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl QueueService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            fs,
            id_provider,
            time_provider,
        }
    }

    /// Create a new queue, generating a session ID unless one is supplied
    pub fn create(
        &self,
        config: QueueConfig,
        session_id: Option<SessionId>,
    ) -> Result<FileQueue, DomainError> {
        let session_id = session_id.unwrap_or_else(|| self.id_provider.generate_id());
        let queue = FileQueue::new(config, session_id, self.time_provider.now())?;
        info!(
            queue = %queue.name(),
            session_id = %queue.session_id(),
            max_size = queue.capacity().as_max_size(),
            "Queue created"
        );
        Ok(queue)
    }

    /// Queue a file for transfer
    ///
    /// Size and modification time are captured when the file can be stat'ed.
    /// A file that passes the existence check but cannot be stat'ed (removed
    /// in between) is still queued, without file info.
    ///
    /// # Errors
    /// - `InvalidArgument` if the source path is empty
    /// - `FileNotFound` if `validate_file` is set and the source is absent
    /// - `QueueFull` if the queue is at capacity
    pub async fn add_file(&self, queue: &mut FileQueue, req: AddFileRequest) -> Result<(), DomainError> {
        if req.source_path.as_os_str().is_empty() {
            return Err(DomainError::InvalidArgument(
                "source path cannot be empty".to_string(),
            ));
        }

        if queue.is_full() {
            // Reuse enqueue's error without touching the file system
            return queue.enqueue(QueueItem::new(req.source_path, self.time_provider.now()));
        }

        if req.validate_file && !self.fs.exists(&req.source_path).await {
            error!(
                queue = %queue.name(),
                path = %req.source_path.display(),
                "Source file not found, not queued"
            );
            return Err(DomainError::FileNotFound(req.source_path));
        }

        let mut item = QueueItem::new(&req.source_path, self.time_provider.now())
            .with_metadata(req.metadata);
        if let Some(target) = req.target_path {
            item = item.with_target(target);
        }

        match self.fs.stat(&req.source_path).await {
            Ok(stat) => {
                item.size_bytes = Some(stat.size_bytes);
                item.last_modified_utc = stat.modified_utc;
            }
            Err(e) => {
                warn!(
                    path = %req.source_path.display(),
                    error = %e,
                    "Source not stat-able, queuing without file info"
                );
            }
        }

        queue.enqueue(item)?;
        debug!(
            queue = %queue.name(),
            path = %req.source_path.display(),
            queued = queue.len(),
            "File queued"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::file_system::mocks::InMemoryFileSystem;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::time_provider::mocks::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::path::Path;

    fn service(fs: Arc<InMemoryFileSystem>) -> QueueService {
        let clock = ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        QueueService::new(
            fs,
            Arc::new(SequentialIdProvider::new("sess")),
            Arc::new(clock),
        )
    }

    #[test]
    fn test_create_generates_session_when_absent() {
        let svc = service(Arc::new(InMemoryFileSystem::new()));

        let generated = svc.create(QueueConfig::new("a"), None).unwrap();
        let supplied = svc
            .create(QueueConfig::new("b"), Some("mine".to_string()))
            .unwrap();

        assert_eq!(generated.session_id(), "sess-1");
        assert_eq!(supplied.session_id(), "mine");
    }

    #[test]
    fn test_create_rejects_invalid_arguments() {
        let svc = service(Arc::new(InMemoryFileSystem::new()));

        assert!(matches!(
            svc.create(QueueConfig::new(""), None),
            Err(DomainError::InvalidArgument(_))
        ));
        assert!(matches!(
            svc.create(QueueConfig::new("q").with_max_size(-5), None),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_capacity_scenario() {
        let fs = Arc::new(InMemoryFileSystem::new());
        let modified = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs.insert(name, "payload", modified);
        }
        let svc = service(fs);
        let mut q = svc.create(QueueConfig::new("Q").with_max_size(2), None).unwrap();

        svc.add_file(&mut q, AddFileRequest::new("a.txt")).await.unwrap();
        svc.add_file(&mut q, AddFileRequest::new("b.txt")).await.unwrap();
        let full = svc.add_file(&mut q, AddFileRequest::new("c.txt")).await;
        assert!(matches!(full, Err(DomainError::QueueFull { .. })));

        let head = q.dequeue().unwrap();
        assert_eq!(head.source_path(), Path::new("a.txt"));
        assert_eq!(head.attempts(), 1);
        assert_eq!(head.size_bytes, Some(7));
        assert_eq!(head.last_modified_utc, Some(modified));

        svc.add_file(&mut q, AddFileRequest::new("c.txt")).await.unwrap();
        assert_eq!(q.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_rejected_when_validating() {
        let svc = service(Arc::new(InMemoryFileSystem::new()));
        let mut q = svc.create(QueueConfig::new("q"), None).unwrap();

        let result = svc.add_file(&mut q, AddFileRequest::new("ghost.txt")).await;

        assert!(matches!(result, Err(DomainError::FileNotFound(_))));
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_queued_without_validation() {
        let svc = service(Arc::new(InMemoryFileSystem::new()));
        let mut q = svc.create(QueueConfig::new("q"), None).unwrap();

        svc.add_file(
            &mut q,
            AddFileRequest::new("later.txt")
                .with_target("/out/later.txt")
                .without_validation(),
        )
        .await
        .unwrap();

        let item = q.peek().unwrap();
        assert!(item.size_bytes.is_none());
        assert!(item.last_modified_utc.is_none());
        assert_eq!(item.target_path.as_deref(), Some(Path::new("/out/later.txt")));
        assert_eq!(item.session_id, q.session_id());
    }

    #[tokio::test]
    async fn test_file_vanishing_after_check_is_still_queued() {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.mark_vanishing("flicker.txt");
        let svc = service(fs);
        let mut q = svc.create(QueueConfig::new("q"), None).unwrap();

        svc.add_file(&mut q, AddFileRequest::new("flicker.txt"))
            .await
            .unwrap();

        assert_eq!(q.len(), 1);
        assert!(q.peek().unwrap().size_bytes.is_none());
    }

    #[tokio::test]
    async fn test_empty_source_rejected_and_round_trip_intact() {
        use crate::application::persistence::QueueStore;

        let fs = Arc::new(InMemoryFileSystem::new());
        let svc = service(fs.clone());
        let mut q = svc
            .create(QueueConfig::new("q").with_state_path("/state/q.json"), None)
            .unwrap();

        let empty = svc
            .add_file(&mut q, AddFileRequest::new("").without_validation())
            .await;
        assert!(matches!(empty, Err(DomainError::InvalidArgument(_))));

        svc.add_file(&mut q, AddFileRequest::new("b.txt").without_validation())
            .await
            .unwrap();

        let store = QueueStore::new(
            fs,
            Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_100, 0).unwrap())),
            Arc::new(SequentialIdProvider::new("restore")),
        );
        store.save(&q, None, true).await.unwrap();
        let restored = store
            .restore(Path::new("/state/q.json"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(restored.len(), q.len());
        let before: Vec<_> = q.iter().collect();
        let after: Vec<_> = restored.iter().collect();
        assert_eq!(before, after);
    }
}
