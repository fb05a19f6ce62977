//! Journal configuration.

use crate::error::{CoreError, CoreResult};
use crate::journal::SegmentCodec;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Configuration for a [`TransactionalFile`](crate::TransactionalFile) session.
///
/// The magic constant and link size live here rather than in globals, so
/// sessions with different journal parameters can coexist in one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalConfig {
    /// Width in bytes of the offset and length fields of a descriptor.
    pub link_size: usize,

    /// Chunk size used when streaming bytes between the two files.
    pub block_size: usize,

    /// Retain the journal after `close()` and `comit()` instead of deleting it.
    pub keep_journal: bool,

    /// Magic value stamped into every descriptor footer.
    pub magic: u32,

    /// Whether to fsync the journal before each destructive write.
    pub sync_on_write: bool,

    /// Suffix appended to the protected path to derive the journal path.
    pub journal_suffix: String,

    /// Suffix appended to the journal path when `comit()` retains it.
    pub retained_suffix: String,
}

impl JournalConfig {
    /// Default descriptor link size.
    pub const DEFAULT_LINK_SIZE: usize = 8;

    /// Default streaming chunk size.
    pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

    /// Default footer magic, `"TXJN"` read big-endian.
    pub const DEFAULT_MAGIC: u32 = 0x5458_4A4E;

    /// Smallest accepted magic. Segment lengths never equal the magic, and
    /// below 2 a before-image cannot be split to avoid it.
    pub const MIN_MAGIC: u32 = 2;

    /// Smallest link size able to hold the root sentinel's magic-as-length.
    pub const MIN_LINK_SIZE: usize = 4;

    /// Largest supported link size.
    pub const MAX_LINK_SIZE: usize = 8;

    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the descriptor link size.
    #[must_use]
    pub const fn link_size(mut self, size: usize) -> Self {
        self.link_size = size;
        self
    }

    /// Sets the streaming chunk size.
    #[must_use]
    pub const fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Sets whether the journal is retained after close and commit.
    #[must_use]
    pub const fn keep_journal(mut self, value: bool) -> Self {
        self.keep_journal = value;
        self
    }

    /// Sets the footer magic.
    #[must_use]
    pub const fn magic(mut self, magic: u32) -> Self {
        self.magic = magic;
        self
    }

    /// Sets whether to fsync the journal before each destructive write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the suffix used to derive the journal path.
    #[must_use]
    pub fn journal_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.journal_suffix = suffix.into();
        self
    }

    /// Sets the suffix used when `comit()` retains a journal.
    #[must_use]
    pub fn retained_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.retained_suffix = suffix.into();
        self
    }

    /// Checks that the configuration can produce a readable journal.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the link size is outside
    /// `4..=8`, the block size is zero or the magic is below
    /// [`MIN_MAGIC`](Self::MIN_MAGIC).
    pub fn validate(&self) -> CoreResult<()> {
        if !(Self::MIN_LINK_SIZE..=Self::MAX_LINK_SIZE).contains(&self.link_size) {
            return Err(CoreError::invalid_config(format!(
                "link size must be between {} and {} bytes, got {}",
                Self::MIN_LINK_SIZE,
                Self::MAX_LINK_SIZE,
                self.link_size
            )));
        }
        if self.block_size == 0 {
            return Err(CoreError::invalid_config("block size must be non-zero"));
        }
        if self.magic < Self::MIN_MAGIC {
            return Err(CoreError::invalid_config(format!(
                "magic must be at least {}, got {}",
                Self::MIN_MAGIC,
                self.magic
            )));
        }
        if self.journal_suffix.is_empty() {
            return Err(CoreError::invalid_config("journal suffix must not be empty"));
        }
        Ok(())
    }

    /// Returns the descriptor codec for this configuration.
    #[must_use]
    pub const fn codec(&self) -> SegmentCodec {
        SegmentCodec::new(self.link_size, self.magic)
    }

    /// Derives the default journal path for a protected file.
    #[must_use]
    pub fn journal_path_for(&self, protected: &Path) -> PathBuf {
        with_suffix(protected, &self.journal_suffix)
    }

    /// Derives the path a retained journal is moved to on commit.
    #[must_use]
    pub fn retained_path_for(&self, journal: &Path) -> PathBuf {
        with_suffix(journal, &self.retained_suffix)
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            link_size: Self::DEFAULT_LINK_SIZE,
            block_size: Self::DEFAULT_BLOCK_SIZE,
            keep_journal: false,
            magic: Self::DEFAULT_MAGIC,
            sync_on_write: true,
            journal_suffix: ".journal".to_string(),
            retained_suffix: ".committed".to_string(),
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
