// File System Port
// Isolates stat/read/write so queue logic can run against test doubles

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::Path;

/// Subset of file metadata captured at enqueue time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub size_bytes: u64,
    pub modified_utc: Option<DateTime<Utc>>,
}

/// File system operations used by the queue
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Whether a regular file exists at `path`
    async fn exists(&self, path: &Path) -> bool;

    /// Size and modification time of the file at `path`
    async fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Read a UTF-8 text file
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace `path` with `contents` so readers never observe a partial file
    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Copy `from` to `to`, creating missing parent directories of `to`.
    /// Returns the number of bytes copied.
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct State {
        files: HashMap<PathBuf, (Vec<u8>, DateTime<Utc>)>,
        vanishing: HashSet<PathBuf>,
        failing_copies: usize,
        copy_calls: usize,
        fail_writes: bool,
    }

    /// In-memory file system
    #[derive(Default)]
    pub struct InMemoryFileSystem {
        state: Mutex<State>,
    }

    impl InMemoryFileSystem {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>, modified: DateTime<Utc>) {
            let mut state = self.state.lock().unwrap();
            state.files.insert(path.into(), (contents.into(), modified));
        }

        pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
            let state = self.state.lock().unwrap();
            state.files.get(path.as_ref()).map(|(data, _)| data.clone())
        }

        /// Report `path` as existing but fail to stat it (file removed mid-check)
        pub fn mark_vanishing(&self, path: impl Into<PathBuf>) {
            self.state.lock().unwrap().vanishing.insert(path.into());
        }

        /// Make the next `n` copies fail with `ErrorKind::Other`
        pub fn fail_next_copies(&self, n: usize) {
            self.state.lock().unwrap().failing_copies = n;
        }

        pub fn set_fail_writes(&self, fail: bool) {
            self.state.lock().unwrap().fail_writes = fail;
        }

        pub fn copy_calls(&self) -> usize {
            self.state.lock().unwrap().copy_calls
        }
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )
    }

    #[async_trait]
    impl FileSystem for InMemoryFileSystem {
        async fn exists(&self, path: &Path) -> bool {
            let state = self.state.lock().unwrap();
            state.files.contains_key(path) || state.vanishing.contains(path)
        }

        async fn stat(&self, path: &Path) -> io::Result<FileStat> {
            let state = self.state.lock().unwrap();
            match state.files.get(path) {
                Some((data, modified)) if !state.vanishing.contains(path) => Ok(FileStat {
                    size_bytes: data.len() as u64,
                    modified_utc: Some(*modified),
                }),
                _ => Err(not_found(path)),
            }
        }

        async fn read_to_string(&self, path: &Path) -> io::Result<String> {
            let state = self.state.lock().unwrap();
            let (data, _) = state.files.get(path).ok_or_else(|| not_found(path))?;
            String::from_utf8(data.clone())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        }

        async fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
            let mut state = self.state.lock().unwrap();
            if state.fail_writes {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "write refused"));
            }
            state
                .files
                .insert(path.to_path_buf(), (contents.to_vec(), Utc::now()));
            Ok(())
        }

        async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
            let mut state = self.state.lock().unwrap();
            state.copy_calls += 1;
            if state.failing_copies > 0 {
                state.failing_copies -= 1;
                return Err(io::Error::new(io::ErrorKind::Other, "simulated copy failure"));
            }
            let (data, modified) = state.files.get(from).cloned().ok_or_else(|| not_found(from))?;
            let len = data.len() as u64;
            state.files.insert(to.to_path_buf(), (data, modified));
            Ok(len)
        }
    }
}
