//! Crash simulation for txfile.
//!
//! Two tools live here:
//!
//! - [`CrashableBackend`] wraps a backend and fails every write once a byte
//!   budget is spent, leaving a torn tail behind. Used against the journal
//!   writer to check that the protected file is never touched before its
//!   before-image is fully journaled.
//! - [`CrashPoint`] / [`simulate_crash`] reproduce the on-disk state a
//!   process would leave behind when killed at various points, so a fresh
//!   session can be opened and rolled back.
//!
//! ## Usage
//!
//! ```rust
//! use txfile_testkit::crash::{simulate_crash, CrashPoint};
//!
//! let outcome = simulate_crash(b"original", CrashPoint::TornPayload).unwrap();
//! assert!(outcome.passed(), "{outcome:?}");
//! ```

use crate::fixtures::{quiet_config, ScratchFile};
use std::fs::{self, OpenOptions};
use std::io::Write;
use txfile_core::journal::{JournalEntry, SegmentScanner};
use txfile_core::{CoreResult, TransactionalFile};
use txfile_storage::{FileBackend, StorageBackend, StorageError, StorageResult};

/// Points at which a crash can be simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashPoint {
    /// Process died with writes journaled; the session was never closed.
    BeforeClose,
    /// A before-image and its footer reached the journal but the write to
    /// the protected file did not happen.
    AfterJournalAppend,
    /// A before-image payload reached the journal without its footer.
    TornPayload,
    /// A rollback restored only the newest segment before dying.
    DuringRollback,
}

impl CrashPoint {
    /// All crash points.
    pub const ALL: [CrashPoint; 4] = [
        CrashPoint::BeforeClose,
        CrashPoint::AfterJournalAppend,
        CrashPoint::TornPayload,
        CrashPoint::DuringRollback,
    ];
}

/// Result of a crash-and-rollback run.
#[derive(Debug, Clone)]
pub struct CrashOutcome {
    /// The simulated crash point.
    pub point: CrashPoint,
    /// Contents before the crashed session started.
    pub expected: Vec<u8>,
    /// Contents after reopening and rolling back.
    pub actual: Vec<u8>,
}

impl CrashOutcome {
    /// Whether rollback after the crash restored the original contents.
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

/// Crashes a session over `original` at `point`, then reopens and rolls back.
///
/// The crashed session always performs the same three writes: one inside
/// the file, one straddling its end and one pure append.
///
/// # Errors
///
/// Returns an error if the recovery session fails to open or roll back.
pub fn simulate_crash(original: &[u8], point: CrashPoint) -> CoreResult<CrashOutcome> {
    let scratch = ScratchFile::new(original);
    let config = quiet_config();
    let len = original.len() as u64;

    {
        let mut file = scratch.open(config.clone())?;
        file.write_at(0, b"head")?;
        file.write_at(len.saturating_sub(2), b"straddle")?;
        file.write_at(len + 16, b"append")?;

        match point {
            CrashPoint::BeforeClose => {}
            CrashPoint::AfterJournalAppend => {
                // Journal a before-image for a write that never lands.
                let codec = config.codec();
                let offset = len / 2;
                let current = fs::read(scratch.path())?;
                let end = current.len().min(offset as usize + 3);
                let mut entry = current[offset as usize..end].to_vec();
                entry.extend(codec.encode(offset, (end - offset as usize) as u64)?);
                append_raw(&scratch, &config, &entry)?;
            }
            CrashPoint::TornPayload => {
                append_raw(&scratch, &config, &[0x5A; 29])?;
            }
            CrashPoint::DuringRollback => {
                restore_newest_segment(&scratch, &config)?;
            }
        }
        // Dropped without close: the journal stays behind.
    }

    let mut file = TransactionalFile::open(scratch.path(), config)?;
    file.rollback()?;
    file.close()?;

    Ok(CrashOutcome {
        point,
        expected: original.to_vec(),
        actual: scratch.contents(),
    })
}

fn append_raw(
    scratch: &ScratchFile,
    config: &txfile_core::JournalConfig,
    bytes: &[u8],
) -> CoreResult<()> {
    let mut journal = OpenOptions::new()
        .append(true)
        .open(scratch.journal_path(config))?;
    journal.write_all(bytes)?;
    Ok(())
}

fn restore_newest_segment(
    scratch: &ScratchFile,
    config: &txfile_core::JournalConfig,
) -> CoreResult<()> {
    let journal = FileBackend::open_read_only(&scratch.journal_path(config))?;
    let mut protected = FileBackend::open(scratch.path())?;

    let newest = SegmentScanner::from_end(&journal, config.codec())?
        .next()
        .transpose()?;
    if let Some(JournalEntry::Segment {
        source_offset,
        payload_length,
        footer_position,
    }) = newest
    {
        let payload = journal.read_at(footer_position - payload_length, payload_length as usize)?;
        protected.write_at(source_offset, &payload)?;
    }
    Ok(())
}

/// A storage backend wrapper that fails writes once a byte budget is spent.
///
/// The write that crosses the budget is applied partially, like a torn
/// write at power loss.
pub struct CrashableBackend<B> {
    inner: B,
    crash_after_bytes: usize,
    bytes_written: usize,
    crashed: bool,
    fail_on_sync: bool,
}

impl<B: StorageBackend> CrashableBackend<B> {
    /// Creates a new crashable backend wrapping an inner backend.
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            crash_after_bytes: usize::MAX,
            bytes_written: 0,
            crashed: false,
            fail_on_sync: false,
        }
    }

    /// Sets the backend to crash after writing the specified number of bytes.
    pub fn crash_after(&mut self, bytes: usize) {
        self.crash_after_bytes = bytes;
        self.bytes_written = 0;
    }

    /// Sets whether sync should fail.
    pub fn set_fail_on_sync(&mut self, fail: bool) {
        self.fail_on_sync = fail;
    }

    /// Returns whether the backend has crashed.
    pub fn has_crashed(&self) -> bool {
        self.crashed
    }

    /// Returns the wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Splits `len` into the bytes allowed before the crash and whether the
    /// crash happens.
    fn budget(&mut self, len: usize) -> (usize, bool) {
        let remaining = self.crash_after_bytes.saturating_sub(self.bytes_written);
        if len <= remaining {
            self.bytes_written += len;
            (len, false)
        } else {
            self.bytes_written += remaining;
            self.crashed = true;
            (remaining, true)
        }
    }
}

fn simulated(what: &str) -> StorageError {
    StorageError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("simulated crash during {what}"),
    ))
}

impl<B: StorageBackend> StorageBackend for CrashableBackend<B> {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        let (allowed, crash) = self.budget(data.len());
        if allowed > 0 {
            self.inner.write_at(offset, &data[..allowed])?;
        }
        if crash {
            return Err(simulated("write"));
        }
        Ok(())
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.inner.size()?;
        let (allowed, crash) = self.budget(data.len());
        if allowed > 0 {
            self.inner.append(&data[..allowed])?;
        }
        if crash {
            return Err(simulated("append"));
        }
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        if self.fail_on_sync {
            self.crashed = true;
            return Err(simulated("sync"));
        }
        self.inner.sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.inner.truncate(new_size)
    }
}
