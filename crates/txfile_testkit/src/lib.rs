//! # txfile Testkit
//!
//! Test utilities for txfile.
//!
//! This crate provides:
//! - Scratch-file fixtures backed by temporary directories
//! - Property-based generators for file contents and write sequences
//! - Crash simulation: a failing backend and on-disk crash scenarios
//! - Golden journal vectors
//! - A session harness that checks a live session against a model
//!
//! ## Usage
//!
//! ```rust
//! use txfile_testkit::prelude::*;
//!
//! let scratch = ScratchFile::new(b"hello");
//! let mut file = scratch.open(quiet_config()).unwrap();
//! file.write_at(0, b"J").unwrap();
//! file.rollback().unwrap();
//! assert_eq!(scratch.contents(), b"hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::vectors::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use vectors::*;
