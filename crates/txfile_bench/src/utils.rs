//! Benchmark utilities.

use rand::Rng;
use std::path::PathBuf;
use tempfile::TempDir;
use txfile_core::{JournalConfig, TransactionalFile};

/// Generate random data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate `count` random write offsets below `limit`.
pub fn random_offsets(count: usize, limit: u64) -> Vec<u64> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen_range(0..limit.max(1))).collect()
}

/// A protected file of `size` random bytes in a fresh temporary directory.
pub fn protected_file(size: usize) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("bench.bin");
    std::fs::write(&path, random_data(size)).expect("Failed to write protected file");
    (dir, path)
}

/// Opens a session that skips per-write fsync.
pub fn open_session(path: &std::path::Path) -> TransactionalFile {
    TransactionalFile::open(path, JournalConfig::new().sync_on_write(false))
        .expect("Failed to open session")
}
