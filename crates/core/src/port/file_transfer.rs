// File Transfer Port
// Abstraction for moving one queued file to its destination

use crate::domain::QueueItem;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Result of a successful transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub destination: PathBuf,
    pub bytes: u64,
}

/// Transfer errors
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("No destination for {0}: item has no target path and no fallback directory is set")]
    NoDestination(PathBuf),

    #[error("Size mismatch for {path}: expected {expected} bytes, copied {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// File Transfer trait
///
/// Implementations:
/// - CopyTransfer (infra-fs): copies source to target on local/UNC paths
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Transfer a single item
    ///
    /// # Errors
    /// - TransferError::NoDestination if the item cannot be routed
    /// - TransferError::Io on read/write failures
    async fn transfer(&self, item: &QueueItem) -> Result<TransferReceipt, TransferError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock transfer behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Fail the first N calls per source path, then succeed
        FailTimes(u32),
        /// Always fail with message
        Fail(String),
    }

    /// Mock File Transfer for testing
    pub struct MockFileTransfer {
        behavior: MockBehavior,
        calls: Mutex<HashMap<PathBuf, u32>>,
    }

    impl MockFileTransfer {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                calls: Mutex::new(HashMap::new()),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn call_count(&self) -> u32 {
            self.calls.lock().unwrap().values().sum()
        }

        pub fn calls_for(&self, path: impl Into<PathBuf>) -> u32 {
            let calls = self.calls.lock().unwrap();
            calls.get(&path.into()).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl FileTransfer for MockFileTransfer {
        async fn transfer(&self, item: &QueueItem) -> Result<TransferReceipt, TransferError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                let count = calls.entry(item.source_path().to_path_buf()).or_insert(0);
                *count += 1;
                *count
            };

            let fail = |msg: String| Err(TransferError::Io(std::io::Error::new(std::io::ErrorKind::Other, msg)));

            match &self.behavior {
                MockBehavior::Success => {}
                MockBehavior::FailTimes(n) if call <= *n => {
                    return fail(format!("transient failure {}", call));
                }
                MockBehavior::FailTimes(_) => {}
                MockBehavior::Fail(msg) => return fail(msg.clone()),
            }

            Ok(TransferReceipt {
                destination: item
                    .target_path
                    .clone()
                    .unwrap_or_else(|| item.source_path().to_path_buf()),
                bytes: item.size_bytes.unwrap_or(0),
            })
        }
    }
}
