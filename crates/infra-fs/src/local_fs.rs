// Local file system adapter
// reason: tokio::fs keeps the async ports non-blocking on the runtime
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use filequeue_core::port::{FileStat, FileSystem};

/// `FileSystem` backed by the local disk (including mounted/UNC shares)
#[derive(Debug, Default, Clone)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Sibling temp path so the final rename stays on one volume
    fn temp_path_for(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state".to_string());
        path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()))
    }

    async fn ensure_parent(path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent).await,
            _ => Ok(()),
        }
    }

    async fn write_then_rename(tmp: &Path, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut file = tokio::fs::File::create(tmp).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(tmp, path).await
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(FileStat {
            size_bytes: metadata.len(),
            modified_utc: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        Self::ensure_parent(path).await?;
        let tmp = Self::temp_path_for(path);

        if let Err(e) = Self::write_then_rename(&tmp, path, contents).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!(path = %tmp.display(), error = %cleanup, "Failed to remove temp file");
                }
            }
            return Err(e);
        }

        debug!(path = %path.display(), bytes = contents.len(), "File written atomically");
        Ok(())
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        Self::ensure_parent(to).await?;
        tokio::fs::copy(from, to).await
    }
}
