//! Queue lifecycle against the real file system
//!
//! Create -> add -> save -> restore in a fresh "process" -> keep going.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use filequeue_core::application::{AddFileRequest, QueueService, QueueStore};
use filequeue_core::domain::{DomainError, QueueConfig, RemoveCriterion};
use filequeue_core::port::id_provider::UuidProvider;
use filequeue_core::port::time_provider::SystemTimeProvider;
use filequeue_infra_fs::LocalFileSystem;
use serde_json::json;

fn wiring() -> (QueueService, QueueStore) {
    let fs = Arc::new(LocalFileSystem::new());
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    (
        QueueService::new(fs.clone(), id_provider.clone(), time_provider.clone()),
        QueueStore::new(fs, time_provider, id_provider),
    )
}

fn write_files(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::write(&path, format!("contents of {}", name)).unwrap();
            path
        })
        .collect()
}

#[tokio::test]
async fn test_capacity_scenario_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_files(dir.path(), &["a.txt", "b.txt", "c.txt"]);
    let (service, _) = wiring();

    let mut q = service
        .create(QueueConfig::new("Q").with_max_size(2), None)
        .unwrap();

    service.add_file(&mut q, AddFileRequest::new(&files[0])).await.unwrap();
    service.add_file(&mut q, AddFileRequest::new(&files[1])).await.unwrap();
    let full = service.add_file(&mut q, AddFileRequest::new(&files[2])).await;
    assert!(matches!(full, Err(DomainError::QueueFull { .. })));

    let head = q.dequeue().unwrap();
    assert_eq!(head.source_path(), files[0]);
    assert_eq!(head.attempts(), 1);
    assert_eq!(head.size_bytes, Some("contents of a.txt".len() as u64));
    assert!(head.last_modified_utc.is_some());

    service.add_file(&mut q, AddFileRequest::new(&files[2])).await.unwrap();
    assert_eq!(q.len(), 2);
}

#[tokio::test]
async fn test_save_and_restore_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_files(dir.path(), &["one.log", "two.log"]);
    let state = dir.path().join("state/queue.json");

    // First run: queue files, attribute metadata, save
    let session_id = {
        let (service, store) = wiring();
        let mut queue = service
            .create(QueueConfig::new("nightly").with_state_path(&state), None)
            .unwrap();

        let mut meta = serde_json::Map::new();
        meta.insert("owner".to_string(), json!("ops"));
        service
            .add_file(&mut queue, AddFileRequest::new(&files[0]).with_metadata(meta))
            .await
            .unwrap();
        service
            .add_file(
                &mut queue,
                AddFileRequest::new(dir.path().join("future.log")).without_validation(),
            )
            .await
            .unwrap();
        service
            .add_file(&mut queue, AddFileRequest::new(&files[1]).with_target("/srv/two.log"))
            .await
            .unwrap();
        queue.processed_count = 4;

        store.save(&queue, None, false).await.unwrap();
        queue.session_id().to_string()
    };

    // Second run: restore and check everything survived
    let (service, store) = wiring();
    let mut queue = store.restore(&state).await.unwrap().unwrap();

    assert_eq!(queue.name(), "nightly");
    assert_eq!(queue.session_id(), session_id);
    assert_eq!(queue.processed_count, 4);
    assert_eq!(queue.len(), 3);

    let items: Vec<_> = queue.iter().cloned().collect();
    assert_eq!(items[0].source_path(), files[0]);
    assert_eq!(items[0].metadata["owner"], json!("ops"));
    assert!(items[1].size_bytes.is_none());
    assert_eq!(items[2].target_path.as_deref(), Some(Path::new("/srv/two.log")));
    assert!(items.iter().all(|i| i.session_id == session_id));

    // A second session adds more work; items stay attributed per session
    let mut second = service
        .create(QueueConfig::new("nightly-2"), None)
        .unwrap();
    let report = store.restore_into(&state, &mut second, false).await.unwrap().unwrap();
    assert_eq!(report.restored, 3);
    service
        .add_file(&mut second, AddFileRequest::new(&files[0]))
        .await
        .unwrap();

    let removed = second.remove_items(RemoveCriterion::Session(&session_id));
    assert_eq!(removed, 3);
    assert_eq!(second.len(), 1);

    // Saving again over the same path needs overwrite
    assert!(store.save(&queue, None, false).await.is_err());
    queue.dequeue();
    store.save(&queue, None, true).await.unwrap();
    let reread = store.restore(&state).await.unwrap().unwrap();
    assert_eq!(reread.len(), 2);
}

#[tokio::test]
async fn test_restore_handwritten_state_file() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("legacy.json");
    std::fs::write(
        &state,
        json!({
            "name": "legacy",
            "sessionId": "abc",
            "created": "2024-03-01T08:00:00Z",
            "savedAt": "2024-03-01T09:00:00Z",
            "processed": 12,
            "failed": 1,
            "maxSize": -1,
            "itemCount": 2,
            "items": [
                { "sourcePath": "D:/exports/a.csv", "size": 10, "attempts": 2 },
                { "sourcePath": "D:/exports/b.csv" }
            ]
        })
        .to_string(),
    )
    .unwrap();

    let (_, store) = wiring();
    let queue = store.restore(&state).await.unwrap().unwrap();

    assert_eq!(queue.capacity().as_max_size(), -1);
    assert_eq!(queue.failed_count, 1);
    assert_eq!(queue.created_utc().to_rfc3339(), "2024-03-01T08:00:00+00:00");

    let items: Vec<_> = queue.iter().collect();
    assert_eq!(items[0].attempts(), 2);
    assert_eq!(items[0].size_bytes, Some(10));
    assert_eq!(items[1].attempts(), 0);
    assert!(items[1].metadata.is_empty());
    assert_eq!(items[1].session_id, "abc");
}

#[tokio::test]
async fn test_restore_missing_and_corrupt_files() {
    let dir = tempfile::tempdir().unwrap();
    let (_, store) = wiring();

    assert!(store
        .restore(&dir.path().join("absent.json"))
        .await
        .unwrap()
        .is_none());

    let corrupt = dir.path().join("corrupt.json");
    std::fs::write(&corrupt, "{\"name\": \"half").unwrap();
    assert!(store.restore(&corrupt).await.is_err());
}
