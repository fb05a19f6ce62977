//! Backward journal scanner.
//!
//! Walks the journal from a start position toward its beginning, yielding one
//! [`JournalEntry`] per footer found. Footer boundaries are recovered from the
//! magic alone: when the footer-sized window ending at the current position
//! does not carry the magic, the window slides back one byte and is probed
//! again.
//!
//! This resynchronization is not collision-free. A payload that happens to
//! contain a well-formed footer at the wrong alignment will be taken for one.

use crate::error::{CoreError, CoreResult};
use crate::journal::segment::{SegmentCodec, SegmentDescriptor};
use std::iter::FusedIterator;
use tracing::warn;
use txfile_storage::StorageBackend;

/// Window size used once the scanner has to probe byte by byte.
const RESYNC_WINDOW: usize = 4096;

/// One entry recovered from the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalEntry {
    /// The root sentinel. Scanning stops here.
    Root {
        /// Length of the protected file when the session started.
        original_length: u64,
        /// Journal offset of the sentinel footer.
        footer_position: u64,
    },
    /// A preserved before-image.
    Segment {
        /// Offset in the protected file the payload was copied from.
        source_offset: u64,
        /// Number of payload bytes.
        payload_length: u64,
        /// Journal offset of the footer; the payload occupies
        /// `[footer_position - payload_length, footer_position)`.
        footer_position: u64,
    },
}

impl JournalEntry {
    /// Returns the journal offset of this entry's footer.
    #[must_use]
    pub const fn footer_position(&self) -> u64 {
        match self {
            Self::Root {
                footer_position, ..
            }
            | Self::Segment {
                footer_position, ..
            } => *footer_position,
        }
    }

    /// Returns the journal offset where this entry's payload starts.
    #[must_use]
    pub const fn payload_start(&self) -> u64 {
        match self {
            Self::Root {
                footer_position, ..
            } => *footer_position,
            Self::Segment {
                payload_length,
                footer_position,
                ..
            } => *footer_position - *payload_length,
        }
    }

    /// Returns `true` for the root sentinel.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        matches!(self, Self::Root { .. })
    }
}

/// Lazy backward scan over a journal.
///
/// Yields the most recent entry first and ends after the root sentinel.
/// The first error also ends the scan. A scan cannot be resumed; build a new
/// scanner to start again.
///
/// # Example
///
/// ```rust
/// use txfile_core::journal::{JournalEntry, JournalWriter, SegmentCodec, SegmentScanner};
/// use txfile_storage::{InMemoryBackend, StorageBackend};
///
/// let writer = JournalWriter::new(SegmentCodec::new(8, 0x5458_4A4E), 4096, false);
/// let mut protected = InMemoryBackend::with_data(vec![0u8; 16]);
/// let mut journal = InMemoryBackend::new();
/// writer.write_root(&mut journal, 16).unwrap();
/// writer.preserve_and_write(&mut protected, &mut journal, 4, b"abcd", 16).unwrap();
///
/// let entries: Vec<JournalEntry> = SegmentScanner::from_end(&journal, writer.codec())
///     .unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(entries.len(), 2);
/// assert!(entries[1].is_root());
/// ```
pub struct SegmentScanner<'a> {
    journal: &'a dyn StorageBackend,
    codec: SegmentCodec,
    /// Entries end at or before this journal offset.
    position: u64,
    /// Cached bytes used while resynchronizing.
    window: Vec<u8>,
    window_start: u64,
    finished: bool,
}

impl<'a> SegmentScanner<'a> {
    /// Creates a scanner that starts at `start_position`.
    #[must_use]
    pub fn new(journal: &'a dyn StorageBackend, codec: SegmentCodec, start_position: u64) -> Self {
        Self {
            journal,
            codec,
            position: start_position,
            window: Vec::new(),
            window_start: 0,
            finished: false,
        }
    }

    /// Creates a scanner that starts at the current end of the journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal size cannot be determined.
    pub fn from_end(journal: &'a dyn StorageBackend, codec: SegmentCodec) -> CoreResult<Self> {
        let size = journal.size()?;
        Ok(Self::new(journal, codec, size))
    }

    fn next_entry(&mut self) -> CoreResult<JournalEntry> {
        let width = self.codec.width() as u64;
        let magic = self.codec.magic();

        if self.position < width {
            return Err(CoreError::invalid_format(format!(
                "no root sentinel: {} bytes left before journal start",
                self.position
            )));
        }

        let first = self.position - width;
        let mut candidate = first;
        loop {
            let desc = self.probe(candidate, candidate != first)?;
            if desc.matches(magic) {
                if candidate != first {
                    warn!(
                        skipped = first - candidate,
                        footer = candidate,
                        "resynchronized journal scan"
                    );
                }
                return self.accept(desc, candidate);
            }

            if candidate == 0 {
                return Err(CoreError::invalid_format(format!(
                    "no descriptor found scanning back from offset {}",
                    self.position
                )));
            }
            candidate -= 1;
        }
    }

    fn accept(&mut self, desc: SegmentDescriptor, footer_position: u64) -> CoreResult<JournalEntry> {
        if desc.is_root(self.codec.magic()) {
            if footer_position != 0 {
                warn!(footer = footer_position, "root sentinel found past journal start");
            }
            self.position = footer_position;
            return Ok(JournalEntry::Root {
                original_length: desc.source_offset,
                footer_position,
            });
        }

        if desc.payload_length > footer_position {
            return Err(CoreError::invalid_format(format!(
                "segment at {} claims {} payload bytes, only {} precede it",
                footer_position, desc.payload_length, footer_position
            )));
        }

        self.position = footer_position - desc.payload_length;
        Ok(JournalEntry::Segment {
            source_offset: desc.source_offset,
            payload_length: desc.payload_length,
            footer_position,
        })
    }

    /// Decodes the footer-sized window at `candidate`.
    ///
    /// The first probe of each entry reads just one footer. Later probes
    /// read through a cached window so a long resync does not issue one read
    /// per byte.
    fn probe(&mut self, candidate: u64, resyncing: bool) -> CoreResult<SegmentDescriptor> {
        let width = self.codec.width();
        if !resyncing {
            let bytes = self.journal.read_at(candidate, width)?;
            return self.codec.decode(&bytes);
        }

        let window_end = self.window_start + self.window.len() as u64;
        if candidate < self.window_start || candidate + width as u64 > window_end {
            let end = candidate + width as u64;
            let start = end.saturating_sub(RESYNC_WINDOW.max(width) as u64);
            self.window = self.journal.read_at(start, (end - start) as usize)?;
            self.window_start = start;
        }

        let at = (candidate - self.window_start) as usize;
        self.codec.decode(&self.window[at..at + width])
    }
}

impl Iterator for SegmentScanner<'_> {
    type Item = CoreResult<JournalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self.next_entry();
        if !matches!(result, Ok(JournalEntry::Segment { .. })) {
            self.finished = true;
        }
        Some(result)
    }
}

impl FusedIterator for SegmentScanner<'_> {}

impl std::fmt::Debug for SegmentScanner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentScanner")
            .field("codec", &self.codec)
            .field("position", &self.position)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Reads the root sentinel at the start of a journal.
///
/// Returns the original length it records.
///
/// # Errors
///
/// Returns [`CoreError::InvalidFormat`] if the journal does not start with a
/// root sentinel for `codec`.
pub fn read_root(journal: &dyn StorageBackend, codec: SegmentCodec) -> CoreResult<u64> {
    let width = codec.width();
    let size = journal.size()?;
    if size < width as u64 {
        return Err(CoreError::invalid_format(format!(
            "journal is {} bytes, too short for a root sentinel",
            size
        )));
    }

    let desc = codec.decode(&journal.read_at(0, width)?)?;
    if !desc.is_root(codec.magic()) {
        return Err(CoreError::invalid_format(format!(
            "journal does not start with a root sentinel (magic {:08x}, length field {})",
            desc.magic, desc.payload_length
        )));
    }

    Ok(desc.source_offset)
}
