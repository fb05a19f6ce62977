//! Journal writer.

use crate::config::JournalConfig;
use crate::error::CoreResult;
use crate::journal::segment::SegmentCodec;
use crate::journal::stream_copy;
use tracing::trace;
use txfile_storage::StorageBackend;

/// What a call to [`JournalWriter::preserve_and_write`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Existing bytes were copied into the journal before the write.
    Preserved {
        /// Number of bytes copied into the journal.
        payload_length: u64,
    },
    /// The write started at or past the original length; nothing was copied.
    Appended,
    /// The write was empty; neither file was touched.
    Empty,
}

/// Appends before-images to the journal ahead of destructive writes.
#[derive(Debug, Clone, Copy)]
pub struct JournalWriter {
    codec: SegmentCodec,
    block_size: usize,
    sync_on_write: bool,
}

impl JournalWriter {
    /// Creates a new journal writer.
    #[must_use]
    pub const fn new(codec: SegmentCodec, block_size: usize, sync_on_write: bool) -> Self {
        Self {
            codec,
            block_size,
            sync_on_write,
        }
    }

    /// Creates a journal writer from a session configuration.
    #[must_use]
    pub const fn from_config(config: &JournalConfig) -> Self {
        Self::new(config.codec(), config.block_size, config.sync_on_write)
    }

    /// Returns the descriptor codec.
    #[must_use]
    pub const fn codec(&self) -> SegmentCodec {
        self.codec
    }

    /// Appends the root sentinel recording `original_length`.
    ///
    /// Must be the first thing written to a new journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the length does not fit the link size or the
    /// append fails.
    pub fn write_root(
        &self,
        journal: &mut dyn StorageBackend,
        original_length: u64,
    ) -> CoreResult<()> {
        let footer = self.codec.encode_root(original_length)?;
        journal.append(&footer)?;
        journal.sync()?;
        Ok(())
    }

    /// Writes `new_bytes` at `target_offset`, preserving what it overwrites.
    ///
    /// When the write starts inside `[0, original_length)`, the bytes it will
    /// overwrite are streamed into the journal and followed by a footer
    /// `(target_offset, preserved)` before the protected file is modified.
    /// If the protected file ends before `target_offset + new_bytes.len()`,
    /// only the bytes that exist are preserved and the footer records that
    /// shorter length. Those missing bytes lie past the current end of file
    /// and are removed by the truncate at the end of a rollback.
    ///
    /// Writes starting at or past `original_length` go straight to the
    /// protected file.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding the footer or any I/O fails. A failure
    /// before the protected file is written leaves it untouched.
    pub fn preserve_and_write(
        &self,
        protected: &mut dyn StorageBackend,
        journal: &mut dyn StorageBackend,
        target_offset: u64,
        new_bytes: &[u8],
        original_length: u64,
    ) -> CoreResult<WriteOutcome> {
        if new_bytes.is_empty() {
            return Ok(WriteOutcome::Empty);
        }

        if target_offset >= original_length {
            protected.write_at(target_offset, new_bytes)?;
            return Ok(WriteOutcome::Appended);
        }

        let available = protected.size()?.saturating_sub(target_offset);
        let preserved = (new_bytes.len() as u64).min(available);

        // Encode first so an overflow leaves no half-written entry behind.
        let segments = self.segments_for(target_offset, preserved)?;
        for (offset, len, footer) in &segments {
            stream_copy(&*protected, *offset, *len, self.block_size, |_, chunk| {
                journal.append(chunk)?;
                Ok(())
            })?;
            journal.append(footer)?;
        }

        if self.sync_on_write {
            journal.sync()?;
        }

        trace!(
            offset = target_offset,
            len = new_bytes.len(),
            preserved,
            segments = segments.len(),
            "preserved before-image"
        );

        protected.write_at(target_offset, new_bytes)?;
        Ok(WriteOutcome::Preserved {
            payload_length: preserved,
        })
    }

    /// Lays out the segments covering `preserved` bytes at `offset`, with
    /// their encoded footers.
    ///
    /// A segment whose length equals the magic would read back as a root
    /// sentinel, so such a before-image is split in two.
    fn segments_for(&self, offset: u64, preserved: u64) -> CoreResult<Vec<(u64, u64, Vec<u8>)>> {
        let lengths = if preserved > 1 && preserved == u64::from(self.codec.magic()) {
            vec![(offset, preserved - 1), (offset + preserved - 1, 1)]
        } else {
            vec![(offset, preserved)]
        };
        lengths
            .into_iter()
            .map(|(start, len)| -> CoreResult<_> {
                Ok((start, len, self.codec.encode(start, len)?))
            })
            .collect()
    }
}
