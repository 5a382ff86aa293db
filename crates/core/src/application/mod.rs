// Application Layer - Use Cases and Business Logic

pub mod intake;
pub mod persistence;
pub mod retry;
pub mod worker;

// Re-exports
pub use intake::{AddFileRequest, QueueService};
pub use persistence::{PersistenceError, QueueStore, RestoreReport};
pub use retry::{RetryConfig, RetryError, RetryExecutor};
pub use worker::{
    shutdown_channel, DistributionSummary, Distributor, FailedTransfer, ShutdownSender,
    ShutdownToken,
};
