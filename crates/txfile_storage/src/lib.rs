//! # txfile Storage
//!
//! Byte storage backends for the txfile journal.
//!
//! This crate is the lowest layer of txfile. Backends are **opaque byte
//! stores**: they do not know about segment descriptors, root sentinels or
//! sessions. Both the protected file and its journal are driven through the
//! same [`StorageBackend`] trait, which is what lets the journal code be
//! unit-tested against [`InMemoryBackend`].
//!
//! ## Design Principles
//!
//! - Positional reads and writes, plus append, flush, sync and truncate
//! - No knowledge of the journal format
//! - No internal locking; a backend has exactly one owner
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing
//! - [`FileBackend`] - For on-disk files, with an optional advisory lock
//!
//! ## Example
//!
//! ```rust
//! use txfile_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.append(b"hello world").unwrap();
//! backend.write_at(0, b"HELLO").unwrap();
//! assert_eq!(backend.read_at(0, 11).unwrap(), b"HELLO world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
