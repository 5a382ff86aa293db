// filequeue Infrastructure - Local File System Adapters
// Implements: FileSystem, FileTransfer

pub mod copy_transfer;
pub mod local_fs;

pub use copy_transfer::CopyTransfer;
pub use local_fs::LocalFileSystem;
