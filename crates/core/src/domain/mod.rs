// Domain Layer - Pure business logic and entities

pub mod error;
pub mod item;
pub mod queue;

// Re-exports
pub use error::DomainError;
pub use item::{Metadata, QueueItem, SessionId};
pub use queue::{Capacity, FileQueue, QueueConfig, RemoveCriterion, DEFAULT_MAX_SIZE};
