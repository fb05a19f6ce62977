//! Transactional file sessions.

use crate::config::JournalConfig;
use crate::error::{CoreError, CoreResult};
use crate::journal::{
    read_root, stream_copy, JournalEntry, JournalWriter, SegmentScanner, WriteOutcome,
};
use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use txfile_storage::{FileBackend, StorageBackend, StorageError};

/// A file whose writes can be committed or rolled back.
///
/// Every write that overlaps the bytes the file held when the session
/// started is preceded by a copy of those bytes in a side journal.
/// [`rollback`](Self::rollback) replays the copies newest-first and truncates
/// the file to its starting length; [`comit`](Self::comit) throws the
/// journal away and starts a new session at the current contents. The
/// protected file's own format is never changed.
///
/// # Sessions
///
/// A session starts when the journal is created, and its root sentinel
/// records the protected file's length at that moment. Opening a file whose
/// journal already exists resumes that session instead of starting a new
/// one, so a process restart keeps accumulating writes that a later rollback
/// still undoes. Dropping a `TransactionalFile` without calling
/// [`close`](Self::close) leaves the journal in place with the same effect.
///
/// # Concurrency
///
/// One instance per protected file. The journal is held under an exclusive
/// advisory lock for the lifetime of the value; a second `open` fails with
/// [`CoreError::JournalLocked`].
///
/// # Example
///
/// ```rust,no_run
/// use txfile_core::{JournalConfig, TransactionalFile};
/// use std::io::{Seek, SeekFrom};
///
/// let mut file = TransactionalFile::open("data.bin", JournalConfig::default())?;
/// file.seek(SeekFrom::Start(128))?;
/// file.write(b"new header")?;
/// file.rollback()?; // data.bin is back to what it was at open
/// file.close()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct TransactionalFile {
    config: JournalConfig,
    writer: JournalWriter,
    protected: FileBackend,
    journal: FileBackend,
    journal_path: PathBuf,
    /// Protected file length when the current session started.
    original_length: u64,
    /// Offset the next read or write starts at.
    cursor: u64,
    resumed: bool,
}

impl TransactionalFile {
    /// Opens `path` with its journal at the default location.
    ///
    /// The journal path is `path` followed by `config.journal_suffix`.
    ///
    /// # Errors
    ///
    /// See [`open_with_journal`](Self::open_with_journal).
    pub fn open(path: impl AsRef<Path>, config: JournalConfig) -> CoreResult<Self> {
        let path = path.as_ref();
        let journal_path = config.journal_path_for(path);
        Self::open_with_journal(path, journal_path, config)
    }

    /// Opens `path` with its journal at `journal_path`.
    ///
    /// Missing files are created. If the journal is absent or empty a new
    /// session starts with the protected file's current length; otherwise
    /// the existing session is resumed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - Another session holds the journal
    /// - An existing journal does not start with a root sentinel
    /// - I/O errors occur
    pub fn open_with_journal(
        path: impl AsRef<Path>,
        journal_path: impl Into<PathBuf>,
        config: JournalConfig,
    ) -> CoreResult<Self> {
        config.validate()?;
        let journal_path = journal_path.into();
        let writer = JournalWriter::from_config(&config);

        let protected = FileBackend::open(path.as_ref())?;
        let mut journal = lock_journal(&journal_path)?;

        let resumed = !journal.is_empty()?;
        let original_length = if resumed {
            read_root(&journal, writer.codec())?
        } else {
            let len = protected.size()?;
            writer.write_root(&mut journal, len)?;
            len
        };

        debug!(
            path = %protected.path().display(),
            journal = %journal_path.display(),
            original_length,
            resumed,
            "opened transactional file"
        );

        Ok(Self {
            config,
            writer,
            protected,
            journal,
            journal_path,
            original_length,
            cursor: 0,
            resumed,
        })
    }

    /// Writes `buf` at the current position and advances past it.
    ///
    /// Bytes of the original contents that the write overwrites are copied
    /// into the journal first.
    ///
    /// # Errors
    ///
    /// Returns an error if journaling or the write fails. Journal entries
    /// appended before the failure remain.
    pub fn write(&mut self, buf: &[u8]) -> CoreResult<WriteOutcome> {
        let outcome = self.writer.preserve_and_write(
            &mut self.protected,
            &mut self.journal,
            self.cursor,
            buf,
            self.original_length,
        )?;
        self.cursor += buf.len() as u64;
        Ok(outcome)
    }

    /// Seeks to `offset` and writes `buf` there.
    ///
    /// # Errors
    ///
    /// See [`write`](Self::write).
    pub fn write_at(&mut self, offset: u64, buf: &[u8]) -> CoreResult<WriteOutcome> {
        self.cursor = offset;
        self.write(buf)
    }

    /// Makes every write since the session started permanent.
    ///
    /// The protected file is synced, the journal is discarded (or renamed
    /// aside when `keep_journal` is set) and a new session starts at the
    /// current length. The position resets to 0.
    ///
    /// # Errors
    ///
    /// Returns an error if syncing, discarding or re-creating the journal
    /// fails.
    pub fn comit(&mut self) -> CoreResult<()> {
        self.protected.flush()?;
        self.protected.sync()?;

        if self.config.keep_journal {
            self.journal.sync()?;
            let retained = self.config.retained_path_for(&self.journal_path);
            fs::rename(&self.journal_path, &retained)?;
            self.journal = lock_journal(&self.journal_path)?;
            debug!(retained = %retained.display(), "retained committed journal");
        } else {
            self.journal.truncate(0)?;
        }

        let len = self.protected.size()?;
        self.begin_session(len)?;
        debug!(length = len, "committed");
        Ok(())
    }

    /// Restores the protected file to its state when the session started.
    ///
    /// Preserved payloads are copied back newest-first, then the file is
    /// truncated to the original length recorded in the root sentinel. The
    /// journal is cleared and a new session starts. The position resets to 0.
    ///
    /// Rollback is not atomic: if it fails part way the protected file is
    /// left partially restored and the journal is left intact.
    ///
    /// If the file was shortened outside the session, the bytes no journal
    /// entry covers come back as zeros so the length still matches.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if the journal is malformed, or
    /// an I/O error.
    pub fn rollback(&mut self) -> CoreResult<()> {
        let codec = self.writer.codec();
        let block_size = self.config.block_size;
        let mut replayed = 0usize;
        let mut root_length = None;

        for entry in SegmentScanner::from_end(&self.journal, codec)? {
            match entry? {
                JournalEntry::Segment {
                    source_offset,
                    payload_length,
                    footer_position,
                } => {
                    let protected = &mut self.protected;
                    stream_copy(
                        &self.journal,
                        footer_position - payload_length,
                        payload_length,
                        block_size,
                        |rel, chunk| {
                            protected.write_at(source_offset + rel, chunk)?;
                            Ok(())
                        },
                    )?;
                    replayed += 1;
                }
                JournalEntry::Root {
                    original_length, ..
                } => root_length = Some(original_length),
            }
        }

        let original_length = root_length
            .ok_or_else(|| CoreError::invalid_format("journal scan ended without a root sentinel"))?;
        if original_length != self.original_length {
            warn!(
                sentinel = original_length,
                session = self.original_length,
                "root sentinel disagrees with session length"
            );
        }

        let current = self.protected.size()?;
        if current < original_length {
            warn!(
                current,
                original_length,
                "protected file shorter than session start, zero-filling"
            );
        }
        self.protected.set_len(original_length)?;
        self.protected.sync()?;

        self.journal.truncate(0)?;
        self.begin_session(original_length)?;

        info!(segments = replayed, length = original_length, "rolled back");
        Ok(())
    }

    /// Closes the file.
    ///
    /// The protected file is flushed and synced. The journal is deleted,
    /// making every write permanent, unless `keep_journal` is set, in which
    /// case it stays in place and the next `open` resumes the session.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or removing the journal fails.
    pub fn close(self) -> CoreResult<()> {
        let Self {
            config,
            mut protected,
            mut journal,
            journal_path,
            ..
        } = self;

        protected.flush()?;
        protected.sync()?;

        if config.keep_journal {
            journal.sync()?;
            debug!(journal = %journal_path.display(), "closed, journal kept");
        } else {
            journal.truncate(0)?;
            drop(journal);
            fs::remove_file(&journal_path)?;
            debug!(journal = %journal_path.display(), "closed, journal removed");
        }
        Ok(())
    }

    /// Flushes both files to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if either flush fails.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.journal.flush()?;
        self.protected.flush()?;
        Ok(())
    }

    /// Returns the offset the next read or write starts at.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.cursor
    }

    /// Returns the current length of the protected file.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    pub fn len(&self) -> CoreResult<u64> {
        Ok(self.protected.size()?)
    }

    /// Returns `true` if the protected file is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    pub fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the protected file's length when the current session started.
    #[must_use]
    pub const fn original_length(&self) -> u64 {
        self.original_length
    }

    /// Returns the current journal length in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    pub fn journal_len(&self) -> CoreResult<u64> {
        Ok(self.journal.size()?)
    }

    /// Returns `true` if this session was resumed from an existing journal.
    #[must_use]
    pub const fn is_resumed(&self) -> bool {
        self.resumed
    }

    /// Returns the protected file's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.protected.path()
    }

    /// Returns the journal's path.
    #[must_use]
    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// Lists the journal's entries, newest first, ending with the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal is malformed or cannot be read.
    pub fn entries(&self) -> CoreResult<Vec<JournalEntry>> {
        SegmentScanner::from_end(&self.journal, self.writer.codec())?.collect()
    }

    /// Writes a fresh root sentinel into the (empty) journal.
    fn begin_session(&mut self, original_length: u64) -> CoreResult<()> {
        self.writer.write_root(&mut self.journal, original_length)?;
        self.original_length = original_length;
        self.cursor = 0;
        self.resumed = false;
        Ok(())
    }
}

impl Read for TransactionalFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = self.protected.size().map_err(into_io)?;
        if buf.is_empty() || self.cursor >= size {
            return Ok(0);
        }

        let n = (size - self.cursor).min(buf.len() as u64) as usize;
        let data = self.protected.read_at(self.cursor, n).map_err(into_io)?;
        buf[..n].copy_from_slice(&data);
        self.cursor += n as u64;
        Ok(n)
    }
}

impl Seek for TransactionalFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self
                .protected
                .size()
                .map_err(into_io)?
                .checked_add_signed(delta),
            SeekFrom::Current(delta) => self.cursor.checked_add_signed(delta),
        };

        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;
        self.cursor = target;
        Ok(target)
    }
}

fn lock_journal(path: &Path) -> CoreResult<FileBackend> {
    let journal = FileBackend::open(path)?;
    match journal.try_lock_exclusive() {
        Ok(()) => Ok(journal),
        Err(StorageError::Locked { path }) => Err(CoreError::JournalLocked { path }),
        Err(e) => Err(e.into()),
    }
}

fn into_io(err: StorageError) -> io::Error {
    match err {
        StorageError::Io(e) => e,
        other => io::Error::other(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn setup(contents: &[u8]) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn config() -> JournalConfig {
        JournalConfig::new().sync_on_write(false)
    }

    #[test]
    fn scenario_overwrite_then_rollback() {
        let (_dir, path) = setup(&[0u8; 100]);
        let mut file = TransactionalFile::open(&path, config()).unwrap();
        assert_eq!(file.original_length(), 100);

        let outcome = file.write_at(10, &[0xFF; 5]).unwrap();
        assert_eq!(outcome, WriteOutcome::Preserved { payload_length: 5 });
        assert_eq!(file.journal_len().unwrap(), 20 + 5 + 20);
        assert_eq!(&fs::read(&path).unwrap()[10..15], &[0xFF; 5]);

        file.rollback().unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![0u8; 100]);
        file.close().unwrap();
    }

    #[test]
    fn scenario_straddling_write_then_rollback() {
        let contents: Vec<u8> = (0..100).collect();
        let (_dir, path) = setup(&contents);
        let mut file = TransactionalFile::open(&path, config()).unwrap();

        file.write_at(98, &[0xAB; 10]).unwrap();
        assert_eq!(file.len().unwrap(), 108);

        file.rollback().unwrap();
        assert_eq!(file.len().unwrap(), 100);
        assert_eq!(fs::read(&path).unwrap(), contents);
    }

    #[test]
    fn rollback_without_writes_is_noop() {
        let (_dir, path) = setup(b"unchanged");
        let mut file = TransactionalFile::open(&path, config()).unwrap();

        file.rollback().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"unchanged");
    }

    #[test]
    fn append_is_discarded_on_rollback() {
        let (_dir, path) = setup(b"base");
        let mut file = TransactionalFile::open(&path, config()).unwrap();

        let outcome = file.write_at(4, b" and more").unwrap();
        assert_eq!(outcome, WriteOutcome::Appended);
        assert_eq!(file.journal_len().unwrap(), 20);

        file.rollback().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"base");
    }

    #[test]
    fn commit_is_final() {
        let (_dir, path) = setup(b"aaaaaaaa");
        let mut file = TransactionalFile::open(&path, config()).unwrap();

        file.write_at(0, b"bb").unwrap();
        file.comit().unwrap();
        assert_eq!(file.original_length(), 8);
        assert_eq!(file.position(), 0);

        file.write_at(4, b"cccccc").unwrap();
        file.rollback().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"bbaaaaaa");
    }

    #[test]
    fn commit_moves_session_length() {
        let (_dir, path) = setup(b"12");
        let mut file = TransactionalFile::open(&path, config()).unwrap();

        file.write_at(2, b"345").unwrap();
        file.comit().unwrap();
        assert_eq!(file.original_length(), 5);

        // Now overlapping the committed append, so it must be preserved.
        let outcome = file.write_at(3, b"x").unwrap();
        assert_eq!(outcome, WriteOutcome::Preserved { payload_length: 1 });
        file.rollback().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"12345");
    }

    #[test]
    fn sequential_writes_advance_cursor() {
        let (_dir, path) = setup(&[b'.'; 6]);
        let mut file = TransactionalFile::open(&path, config()).unwrap();

        file.write(b"ab").unwrap();
        file.write(b"cd").unwrap();
        assert_eq!(file.position(), 4);
        assert_eq!(fs::read(&path).unwrap(), b"abcd..");

        file.rollback().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"......");
    }

    #[test]
    fn overlapping_writes_restore_oldest_bytes() {
        let (_dir, path) = setup(b"0123456789");
        let mut file = TransactionalFile::open(&path, config()).unwrap();

        file.write_at(2, b"AAAA").unwrap();
        file.write_at(4, b"BBBB").unwrap();
        file.write_at(0, b"CCCCCCCCCCCC").unwrap();

        file.rollback().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"0123456789");
    }

    #[test]
    fn close_removes_journal_and_keeps_writes() {
        let (_dir, path) = setup(b"hello");
        let mut file = TransactionalFile::open(&path, config()).unwrap();
        let journal = file.journal_path().to_path_buf();
        assert!(journal.exists());

        file.write_at(0, b"J").unwrap();
        file.close().unwrap();

        assert!(!journal.exists());
        assert_eq!(fs::read(&path).unwrap(), b"Jello");
    }

    #[test]
    fn kept_journal_resumes_session() {
        let (_dir, path) = setup(b"original");
        let keep = config().keep_journal(true);

        let mut file = TransactionalFile::open(&path, keep.clone()).unwrap();
        file.write_at(0, b"CHANGED!").unwrap();
        file.close().unwrap();

        let mut file = TransactionalFile::open(&path, keep).unwrap();
        assert!(file.is_resumed());
        assert_eq!(file.original_length(), 8);

        file.write_at(8, b" tail").unwrap();
        file.rollback().unwrap();
        assert!(!file.is_resumed());
        assert_eq!(fs::read(&path).unwrap(), b"original");
    }

    #[test]
    fn dropped_session_resumes() {
        let (_dir, path) = setup(b"abc");
        {
            let mut file = TransactionalFile::open(&path, config()).unwrap();
            file.write_at(1, b"Z").unwrap();
        }

        let mut file = TransactionalFile::open(&path, config()).unwrap();
        assert!(file.is_resumed());
        file.rollback().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn commit_with_kept_journal_renames_it() {
        let (_dir, path) = setup(b"data");
        let keep = config().keep_journal(true);
        let mut file = TransactionalFile::open(&path, keep).unwrap();

        file.write_at(0, b"D").unwrap();
        file.comit().unwrap();

        let retained = file.config().retained_path_for(file.journal_path());
        assert!(retained.exists());
        assert_eq!(fs::metadata(&retained).unwrap().len(), 20 + 1 + 20);
        assert_eq!(file.journal_len().unwrap(), 20);
    }

    #[test]
    fn second_session_is_locked_out() {
        let (_dir, path) = setup(b"x");
        let _first = TransactionalFile::open(&path, config()).unwrap();

        let second = TransactionalFile::open(&path, config());
        assert!(matches!(second, Err(CoreError::JournalLocked { .. })));
    }

    #[test]
    fn corrupt_journal_refuses_to_open() {
        let (dir, path) = setup(b"x");
        let journal = dir.path().join("data.bin.journal");
        fs::write(&journal, b"definitely not a root sentinel").unwrap();

        let result = TransactionalFile::open(&path, config());
        assert!(result.unwrap_err().is_format_error());
    }

    #[test]
    fn empty_journal_starts_fresh_session() {
        let (dir, path) = setup(b"abc");
        fs::write(dir.path().join("data.bin.journal"), b"").unwrap();

        let file = TransactionalFile::open(&path, config()).unwrap();
        assert!(!file.is_resumed());
        assert_eq!(file.original_length(), 3);
    }

    #[test]
    fn custom_journal_path_and_link_size() {
        let (dir, path) = setup(&[1u8; 32]);
        let journal = dir.path().join("side.log");
        let cfg = config().link_size(4).block_size(3);

        let mut file = TransactionalFile::open_with_journal(&path, &journal, cfg).unwrap();
        file.write_at(5, &[9u8; 10]).unwrap();
        assert_eq!(fs::metadata(&journal).unwrap().len(), 12 + 10 + 12);

        file.rollback().unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![1u8; 32]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (_dir, path) = setup(b"x");
        let result = TransactionalFile::open(&path, config().link_size(2));
        assert!(matches!(result, Err(CoreError::InvalidConfig { .. })));
    }

    #[test]
    fn read_and_seek_delegate() {
        let (_dir, path) = setup(b"0123456789");
        let mut file = TransactionalFile::open(&path, config()).unwrap();

        file.seek(SeekFrom::End(-3)).unwrap();
        let mut buf = [0u8; 8];
        let n = file.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"789");
        assert_eq!(file.read(&mut buf).unwrap(), 0);

        file.seek(SeekFrom::Start(2)).unwrap();
        file.seek(SeekFrom::Current(1)).unwrap();
        assert_eq!(file.position(), 3);
        assert!(file.seek(SeekFrom::Current(-4)).is_err());
    }

    #[test]
    fn entries_list_newest_first() {
        let (_dir, path) = setup(&[0u8; 16]);
        let mut file = TransactionalFile::open(&path, config()).unwrap();

        file.write_at(0, b"a").unwrap();
        file.write_at(8, b"bb").unwrap();

        let entries = file.entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(matches!(
            entries[0],
            JournalEntry::Segment {
                source_offset: 8,
                payload_length: 2,
                ..
            }
        ));
        assert!(entries[2].is_root());
    }

    #[test]
    fn journal_grows_monotonically() {
        let (_dir, path) = setup(&[0u8; 64]);
        let mut file = TransactionalFile::open(&path, config()).unwrap();

        let mut last = file.journal_len().unwrap();
        for (offset, len) in [(0u64, 4usize), (70, 3), (10, 0), (60, 10), (2, 1)] {
            file.write_at(offset, &vec![0xEE; len]).unwrap();
            let now = file.journal_len().unwrap();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn magic_length_overwrite_rolls_back() {
        let original: Vec<u8> = (0..400u32).map(|i| i as u8).collect();
        let (_dir, path) = setup(&original);
        let mut file = TransactionalFile::open(&path, config().magic(0x101)).unwrap();

        file.write_at(0, b"AAAA").unwrap();
        file.write_at(10, &[0xEE; 0x101]).unwrap();
        assert_eq!(file.entries().unwrap().len(), 4);

        file.rollback().unwrap();
        assert_eq!(file.len().unwrap(), 400);
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn rollback_regrows_file_shrunk_between_sessions() {
        let (_dir, path) = setup(&[7u8; 100]);
        {
            let mut file = TransactionalFile::open(&path, config()).unwrap();
            file.write_at(0, b"xx").unwrap();
        }
        fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(50)
            .unwrap();

        let mut file = TransactionalFile::open(&path, config()).unwrap();
        assert_eq!(file.original_length(), 100);
        file.write_at(60, b"yy").unwrap();
        file.rollback().unwrap();

        // Bytes lost to the shrink have no before-image; only the length
        // and the journaled prefix come back.
        let restored = fs::read(&path).unwrap();
        assert_eq!(restored.len(), 100);
        assert_eq!(&restored[..50], &[7u8; 50][..]);
        assert_eq!(&restored[50..60], &[0u8; 10][..]);

        file.rollback().unwrap();
        assert_eq!(file.len().unwrap(), 100);
        file.close().unwrap();
    }
}
