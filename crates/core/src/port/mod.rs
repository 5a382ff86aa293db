// Port Layer - Interfaces for external dependencies

pub mod file_system;
pub mod file_transfer;
pub mod id_provider; // For deterministic testing
pub mod time_provider;

// Re-exports
pub use file_system::{FileStat, FileSystem};
pub use file_transfer::{FileTransfer, TransferError, TransferReceipt};
pub use id_provider::IdProvider;
pub use time_provider::TimeProvider;
