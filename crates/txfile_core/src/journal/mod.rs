//! Before-image journal.
//!
//! The journal is a side file that holds copies of protected-file bytes taken
//! immediately before they are overwritten. Rolling back replays those copies
//! newest-first and then truncates the protected file to its original length.
//!
//! ## Journal Format
//!
//! ```text
//! | root sentinel | payload | footer | payload | footer | ... |
//!
//! footer = | source_offset (N) | payload_length (N) | magic (4) |
//! ```
//!
//! All integers are big-endian; `N` is the configured link size. The root
//! sentinel is a footer with no payload whose `payload_length` field equals
//! the magic and whose `source_offset` is the protected file's length when
//! the session started.
//!
//! ## Scanning
//!
//! Footers are not indexed. The scanner starts at the end of the journal and
//! walks backward: it decodes the footer-sized window ending at the current
//! position, and if the magic does not match it slides the window back one
//! byte at a time until it does. A torn append (payload written, footer
//! missing) is therefore skipped over on rollback.
//!
//! ## Invariants
//!
//! - The journal is **append-only** within a session
//! - Payload and footer are appended **before** the protected file is touched
//! - The root sentinel is written once, when the journal is created
//! - All copies stream through a buffer of at most `block_size` bytes

mod scanner;
mod segment;
mod writer;

pub use scanner::{read_root, JournalEntry, SegmentScanner};
pub use segment::{SegmentCodec, SegmentDescriptor, MAGIC_SIZE};
pub use writer::{JournalWriter, WriteOutcome};

use crate::error::CoreResult;
use txfile_storage::StorageBackend;

/// Streams `len` bytes starting at `offset` out of `source` in chunks of at
/// most `block_size`, handing each chunk to `sink` with its position relative
/// to `offset`.
pub(crate) fn stream_copy<F>(
    source: &dyn StorageBackend,
    offset: u64,
    len: u64,
    block_size: usize,
    mut sink: F,
) -> CoreResult<()>
where
    F: FnMut(u64, &[u8]) -> CoreResult<()>,
{
    let mut copied = 0u64;
    while copied < len {
        let chunk = (len - copied).min(block_size as u64) as usize;
        let data = source.read_at(offset + copied, chunk)?;
        sink(copied, &data)?;
        copied += chunk as u64;
    }
    Ok(())
}
