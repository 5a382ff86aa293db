// Copy-based FileTransfer
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use filequeue_core::domain::QueueItem;
use filequeue_core::port::{FileSystem, FileTransfer, TransferError, TransferReceipt};

/// Copies each item's source to its target path
///
/// Items without a target land in `fallback_dir` under their own file name.
pub struct CopyTransfer {
    fs: Arc<dyn FileSystem>,
    fallback_dir: Option<PathBuf>,
}

impl CopyTransfer {
    /// Create a new copy transfer
    ///
    /// # Example
    /// ```ignore
    /// let transfer = CopyTransfer::new(
    ///     Arc::new(LocalFileSystem::new()),
    ///     Some(PathBuf::from(r"\\fileserver\drop")),
    /// );
    /// ```
    pub fn new(fs: Arc<dyn FileSystem>, fallback_dir: Option<PathBuf>) -> Self {
        Self { fs, fallback_dir }
    }

    fn destination_for(&self, item: &QueueItem) -> Result<PathBuf, TransferError> {
        if let Some(target) = &item.target_path {
            return Ok(target.clone());
        }
        match (&self.fallback_dir, item.source_path().file_name()) {
            (Some(dir), Some(name)) => Ok(dir.join(name)),
            _ => Err(TransferError::NoDestination(item.source_path().to_path_buf())),
        }
    }
}

#[async_trait]
impl FileTransfer for CopyTransfer {
    async fn transfer(&self, item: &QueueItem) -> Result<TransferReceipt, TransferError> {
        let destination = self.destination_for(item)?;
        debug!(
            source = %item.source_path().display(),
            destination = %destination.display(),
            "Copying file"
        );

        let bytes = self.fs.copy(item.source_path(), &destination).await?;

        // Catch short writes on flaky network shares
        let written = self.fs.stat(&destination).await?.size_bytes;
        if written != bytes {
            return Err(TransferError::SizeMismatch {
                path: destination,
                expected: bytes,
                actual: written,
            });
        }

        Ok(TransferReceipt { destination, bytes })
    }
}
