// Worker - Queue processing loop

pub mod constants;
mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::persistence::QueueStore;
use crate::application::retry::{RetryConfig, RetryError, RetryExecutor};
use crate::domain::FileQueue;
use crate::error::Result;
use crate::port::FileTransfer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A transfer that ran out of attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTransfer {
    pub source_path: PathBuf,
    pub attempts: u32,
    pub error: String,
}

/// Outcome of one `Distributor::run`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionSummary {
    pub processed: u64,
    pub failed: u64,
    pub failures: Vec<FailedTransfer>,
    /// Stopped by shutdown with items still queued
    pub interrupted: bool,
}

struct Checkpoint {
    store: Arc<QueueStore>,
    every: usize,
}

/// Drains a `FileQueue`, transferring each item through the retry executor
pub struct Distributor {
    transfer: Arc<dyn FileTransfer>,
    retry_config: RetryConfig,
    checkpoint: Option<Checkpoint>,
}

impl Distributor {
    pub fn new(transfer: Arc<dyn FileTransfer>, retry_config: RetryConfig) -> Self {
        Self {
            transfer,
            retry_config,
            checkpoint: None,
        }
    }

    /// Persist the queue to its state path after every `every` items and
    /// when the run ends. `every = 0` only saves at the end.
    pub fn with_checkpoint(mut self, store: Arc<QueueStore>, every: usize) -> Self {
        self.checkpoint = Some(Checkpoint { store, every });
        self
    }

    /// Process items until the queue is empty or shutdown is requested
    ///
    /// Exhausted retries count as failures and the loop moves on. An item
    /// whose retries were cancelled by shutdown goes back to the head of
    /// the queue so a restored run picks it up again.
    ///
    /// # Errors
    /// `AppError::Persistence` if the end-of-run checkpoint cannot be written.
    pub async fn run(&self, queue: &mut FileQueue, shutdown: ShutdownToken) -> Result<DistributionSummary> {
        info!(queue = %queue.name(), pending = queue.len(), "Distribution started");
        let executor = RetryExecutor::new(self.retry_config.clone()).with_shutdown(shutdown.clone());
        let mut summary = DistributionSummary::default();
        let mut since_checkpoint = 0usize;

        loop {
            if shutdown.is_shutdown() {
                summary.interrupted = !queue.is_empty();
                info!(queue = %queue.name(), remaining = queue.len(), "Distribution interrupted");
                break;
            }

            let Some(item) = queue.dequeue() else {
                break;
            };

            let description = format!("transfer {}", item.source_path().display());
            let outcome = executor
                .run(&description, || self.transfer.transfer(&item))
                .await;

            match outcome {
                Ok(receipt) => {
                    queue.processed_count += 1;
                    summary.processed += 1;
                    info!(
                        source = %item.source_path().display(),
                        destination = %receipt.destination.display(),
                        bytes = receipt.bytes,
                        "Transfer complete"
                    );
                }
                Err(RetryError::Exhausted {
                    attempts,
                    last_error,
                    ..
                }) => {
                    queue.failed_count += 1;
                    summary.failed += 1;
                    error!(
                        source = %item.source_path().display(),
                        attempts = attempts,
                        error = %last_error,
                        "Transfer failed"
                    );
                    summary.failures.push(FailedTransfer {
                        source_path: item.source_path().to_path_buf(),
                        attempts,
                        error: last_error.to_string(),
                    });
                }
                Err(RetryError::Cancelled { .. }) => {
                    warn!(source = %item.source_path().display(), "Transfer cancelled, item returned to queue");
                    queue.return_to_front(item);
                    continue;
                }
            }

            since_checkpoint += 1;
            if let Some(checkpoint) = &self.checkpoint {
                if checkpoint.every > 0 && since_checkpoint >= checkpoint.every {
                    since_checkpoint = 0;
                    // Periodic checkpoint failures are logged by the store; processing carries on
                    let _ = checkpoint.store.save(queue, None, true).await;
                }
            }
        }

        if let Some(checkpoint) = &self.checkpoint {
            checkpoint.store.save(queue, None, true).await?;
        }

        info!(
            queue = %queue.name(),
            processed = summary.processed,
            failed = summary.failed,
            remaining = queue.len(),
            "Distribution finished"
        );
        Ok(summary)
    }
}
