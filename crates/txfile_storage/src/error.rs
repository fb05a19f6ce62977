//! Storage errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used by every backend.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failures reported by a [`StorageBackend`](crate::StorageBackend).
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying file operation failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A read asked for bytes the store does not hold.
    #[error("read of {len} bytes at {offset} runs past end of store ({size} bytes)")]
    ReadPastEnd {
        /// Start of the read.
        offset: u64,
        /// Bytes requested.
        len: usize,
        /// Store length at the time.
        size: u64,
    },

    /// `truncate` was asked to grow the store.
    #[error("truncate to {new_size} bytes would grow a {size}-byte store")]
    TruncateBeyondEnd {
        /// Requested length.
        new_size: u64,
        /// Store length at the time.
        size: u64,
    },

    /// Another handle holds the file's exclusive lock.
    #[error("{} is locked by another session", path.display())]
    Locked {
        /// The locked file.
        path: PathBuf,
    },
}
