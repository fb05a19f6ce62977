//! The byte-store seam between the journal and the filesystem.

use crate::error::StorageResult;

/// Positional byte access to either side of a transactional session.
///
/// The same trait fronts both the protected file, which is overwritten in
/// place, and its journal, which only ever grows by `append` until a session
/// ends. A backend never interprets what it stores.
///
/// Backends are `Send` but take `&mut self` for every mutation; a session
/// owns its backends and no internal locking is expected.
///
/// # Invariants
///
/// - `read_at` sees every byte written before it, at the offset it was
///   written to
/// - `write_at` past the end grows the store, and any gap reads as zeros
/// - `append` writes at `size()` and returns that offset
/// - `truncate` only shrinks; `set_len` also grows, zero-filled
pub trait StorageBackend: Send {
    /// Reads exactly `len` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadPastEnd`](crate::StorageError::ReadPastEnd)
    /// if fewer than `len` bytes exist past `offset`, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Writes `data` at `offset`, replacing what was there.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Writes `data` at the current end and returns where it landed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Current length in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the length cannot be read.
    fn size(&self) -> StorageResult<u64>;

    /// Makes every write so far durable, length included.
    ///
    /// The journal is synced here before the protected file is touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Cuts the store down to `new_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TruncateBeyondEnd`](crate::StorageError::TruncateBeyondEnd)
    /// if `new_size` exceeds the current length, or an I/O error.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Sets the length to exactly `new_size` bytes, shrinking or growing.
    ///
    /// Bytes added by growing read as zeros.
    ///
    /// # Errors
    ///
    /// Returns an error if resizing fails.
    fn set_len(&mut self, new_size: u64) -> StorageResult<()> {
        let size = self.size()?;
        if new_size <= size {
            self.truncate(new_size)
        } else {
            self.write_at(new_size - 1, &[0])
        }
    }

    /// Returns `true` when nothing has been stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the length cannot be read.
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.size()? == 0)
    }
}
