//! Error types for txfile core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while journaling, committing or rolling back.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] txfile_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The journal is malformed: missing root sentinel, or the backward scan
    /// ran off the start of the journal without finding a descriptor.
    #[error("invalid journal format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// A value does not fit in the configured descriptor link size.
    #[error("value {value} does not fit in a {link_size}-byte link")]
    LinkOverflow {
        /// The value that was being encoded.
        value: u64,
        /// The configured link size in bytes.
        link_size: usize,
    },

    /// The journal configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// Another session already holds the journal.
    #[error("journal is locked by another session: {}", path.display())]
    JournalLocked {
        /// Path of the journal file.
        path: PathBuf,
    },
}

impl CoreError {
    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns `true` for errors caused by a malformed journal.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::InvalidFormat { .. })
    }
}
