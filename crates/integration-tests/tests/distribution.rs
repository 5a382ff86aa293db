//! End-to-end distribution: queue -> retrying copy -> checkpoint -> resume

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use filequeue_core::application::{
    shutdown_channel, AddFileRequest, Distributor, QueueService, QueueStore, RetryConfig,
};
use filequeue_core::domain::QueueConfig;
use filequeue_core::port::file_system::mocks::InMemoryFileSystem;
use filequeue_core::port::id_provider::UuidProvider;
use filequeue_core::port::time_provider::SystemTimeProvider;
use filequeue_core::port::FileSystem;
use filequeue_infra_fs::{CopyTransfer, LocalFileSystem};

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        base_delay: Duration::from_millis(1),
        max_attempts,
        max_backoff: Duration::from_millis(5),
    }
}

struct Harness {
    service: QueueService,
    store: Arc<QueueStore>,
    fs: Arc<dyn FileSystem>,
}

fn harness(fs: Arc<dyn FileSystem>) -> Harness {
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    Harness {
        service: QueueService::new(fs.clone(), id_provider.clone(), time_provider.clone()),
        store: Arc::new(QueueStore::new(fs.clone(), time_provider, id_provider)),
        fs,
    }
}

#[tokio::test]
async fn test_distributes_files_and_records_failures() {
    let dir = tempfile::tempdir().unwrap();
    let inbox = dir.path().join("inbox");
    let outbox = dir.path().join("outbox");
    std::fs::create_dir_all(&inbox).unwrap();
    for name in ["a.dat", "b.dat"] {
        std::fs::write(inbox.join(name), name.repeat(100)).unwrap();
    }

    let h = harness(Arc::new(LocalFileSystem::new()));
    let mut queue = h
        .service
        .create(
            QueueConfig::new("outbound").with_state_path(dir.path().join("state.json")),
            None,
        )
        .unwrap();
    h.service
        .add_file(&mut queue, AddFileRequest::new(inbox.join("a.dat")))
        .await
        .unwrap();
    // Queued before it exists and never shows up
    h.service
        .add_file(
            &mut queue,
            AddFileRequest::new(inbox.join("never.dat")).without_validation(),
        )
        .await
        .unwrap();
    h.service
        .add_file(
            &mut queue,
            AddFileRequest::new(inbox.join("b.dat")).with_target(outbox.join("renamed/b.dat")),
        )
        .await
        .unwrap();

    let transfer = Arc::new(CopyTransfer::new(h.fs.clone(), Some(outbox.clone())));
    let distributor = Distributor::new(transfer, fast_retry(3)).with_checkpoint(h.store.clone(), 0);
    let (_tx, token) = shutdown_channel();

    let summary = distributor.run(&mut queue, token).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].source_path, inbox.join("never.dat"));
    assert_eq!(summary.failures[0].attempts, 3);
    assert!(queue.is_empty());

    assert_eq!(std::fs::read(outbox.join("a.dat")).unwrap(), "a.dat".repeat(100).into_bytes());
    assert!(outbox.join("renamed/b.dat").exists());

    let saved = h
        .store
        .restore(&dir.path().join("state.json"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.processed_count, 2);
    assert_eq!(saved.failed_count, 1);
    assert!(saved.is_empty());
}

#[tokio::test]
async fn test_transient_copy_failures_are_retried() {
    let mem = Arc::new(InMemoryFileSystem::new());
    mem.insert("/in/report.pdf", "pdf-bytes", chrono::Utc::now());
    mem.fail_next_copies(2);

    let h = harness(mem.clone());
    let mut queue = h.service.create(QueueConfig::new("q"), None).unwrap();
    h.service
        .add_file(&mut queue, AddFileRequest::new("/in/report.pdf").with_target("/out/report.pdf"))
        .await
        .unwrap();

    let distributor = Distributor::new(Arc::new(CopyTransfer::new(mem.clone(), None)), fast_retry(3));
    let (_tx, token) = shutdown_channel();
    let summary = distributor.run(&mut queue, token).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(mem.copy_calls(), 3);
    assert_eq!(mem.contents("/out/report.pdf").unwrap(), b"pdf-bytes");
}

#[tokio::test]
async fn test_interrupted_run_resumes_from_checkpoint() {
    let mem = Arc::new(InMemoryFileSystem::new());
    for i in 0..3 {
        mem.insert(format!("/in/{}.txt", i), "x", chrono::Utc::now());
    }
    // First file keeps failing so the run is stuck in backoff when we stop it
    mem.fail_next_copies(usize::MAX);

    let h = harness(mem.clone());
    let state = Path::new("/state/resume.json");
    let mut queue = h
        .service
        .create(QueueConfig::new("resume").with_state_path(state), None)
        .unwrap();
    for i in 0..3 {
        h.service
            .add_file(&mut queue, AddFileRequest::new(format!("/in/{}.txt", i)).with_target(format!("/out/{}.txt", i)))
            .await
            .unwrap();
    }

    let slow = RetryConfig {
        base_delay: Duration::from_secs(30),
        max_attempts: 0,
        max_backoff: Duration::from_secs(30),
    };
    let distributor = Distributor::new(Arc::new(CopyTransfer::new(mem.clone(), None)), slow)
        .with_checkpoint(h.store.clone(), 1);
    let (tx, token) = shutdown_channel();
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.shutdown();
    });

    let summary = tokio::time::timeout(Duration::from_secs(5), distributor.run(&mut queue, token))
        .await
        .expect("shutdown should stop the run")
        .unwrap();
    stopper.await.unwrap();
    assert!(summary.interrupted);

    // Next process: restore and finish with a healthy share
    mem.fail_next_copies(0);
    let mut resumed = h.store.restore(state).await.unwrap().unwrap();
    assert_eq!(resumed.len(), 3);
    assert_eq!(resumed.peek().unwrap().attempts(), 1);

    let distributor = Distributor::new(Arc::new(CopyTransfer::new(mem.clone(), None)), fast_retry(3));
    let (_tx, token) = shutdown_channel();
    let summary = distributor.run(&mut resumed, token).await.unwrap();

    assert_eq!(summary.processed, 3);
    for i in 0..3 {
        assert!(mem.contents(format!("/out/{}.txt", i)).is_some());
    }
}
