use thiserror::Error;

/// Every failure a file system operation can report. All of them are
/// recoverable at the command boundary except a `Storage` error raised while
/// building the block store.
#[derive(Error, Debug)]
pub enum VfsError {
    #[error("'{0}' not found")]
    NotFound(String),
    #[error("'{0}' already exists")]
    AlreadyExists(String),
    #[error("'{0}' is not a directory")]
    NotADirectory(String),
    #[error("'{0}' is not a file")]
    NotAFile(String),
    #[error("directory '{0}' is not empty")]
    DirectoryNotEmpty(String),
    #[error("disk full: {needed} blocks needed, {free} free")]
    DiskFull { needed: usize, free: usize },
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("Usage: {usage}")]
    InvalidUsage { usage: &'static str },
    /// The free pool had nothing left to issue.
    #[error("no free blocks left to issue")]
    Exhausted,
    #[error("block storage failure: {0}")]
    Storage(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VfsError>;
