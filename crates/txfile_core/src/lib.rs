//! # txfile Core
//!
//! Reversible, committable writes for a plain file.
//!
//! This crate provides:
//! - [`TransactionalFile`], a session over one protected file with
//!   `write`, `comit`, `rollback` and `close`
//! - The before-image [`journal`]: descriptor codec, writer and backward
//!   scanner
//! - [`JournalConfig`] for link size, block size, magic and retention
//!
//! The protected file keeps its own format; all bookkeeping lives in a side
//! journal next to it.
//!
//! ## Example
//!
//! ```rust
//! use txfile_core::{JournalConfig, TransactionalFile};
//!
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("data.bin");
//! std::fs::write(&path, [0u8; 100])?;
//!
//! let mut file = TransactionalFile::open(&path, JournalConfig::default())?;
//! file.write_at(10, &[0xFF; 5])?;
//! file.rollback()?;
//! file.close()?;
//!
//! assert_eq!(std::fs::read(&path)?, vec![0u8; 100]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod file;
pub mod journal;

pub use config::JournalConfig;
pub use error::{CoreError, CoreResult};
pub use file::TransactionalFile;
pub use journal::{JournalEntry, WriteOutcome};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
