//! Property-based test generators using proptest.
//!
//! Provides strategies for protected-file contents, write sequences and
//! journal configurations, plus an in-memory model of what a sequence of
//! writes does to a file.

use proptest::prelude::*;
use txfile_core::JournalConfig;

/// One positional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOp {
    /// Offset the write starts at.
    pub offset: u64,
    /// Bytes written.
    pub data: Vec<u8>,
}

/// Strategy for protected-file contents up to `max_len` bytes.
pub fn file_contents_strategy(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Strategy for one write starting below `max_offset`.
pub fn write_op_strategy(max_offset: u64, max_len: usize) -> impl Strategy<Value = WriteOp> {
    (0..max_offset, prop::collection::vec(any::<u8>(), 0..=max_len))
        .prop_map(|(offset, data)| WriteOp { offset, data })
}

/// Strategy for a sequence of up to `max_ops` writes.
pub fn write_sequence_strategy(
    max_offset: u64,
    max_len: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<WriteOp>> {
    prop::collection::vec(write_op_strategy(max_offset, max_len), 0..=max_ops)
}

/// Strategy for valid journal configurations with small blocks.
///
/// Includes magics small enough that generated writes hit a before-image
/// exactly as long as the magic.
pub fn config_strategy() -> impl Strategy<Value = JournalConfig> {
    (
        JournalConfig::MIN_LINK_SIZE..=JournalConfig::MAX_LINK_SIZE,
        1usize..64,
        prop_oneof![
            Just(JournalConfig::DEFAULT_MAGIC),
            Just(0xDEAD_BEEF_u32),
            Just(0x0000_0101_u32),
            Just(0x0000_0020_u32),
            Just(0x0000_0010_u32),
        ],
    )
        .prop_map(|(link_size, block_size, magic)| {
            JournalConfig::new()
                .link_size(link_size)
                .block_size(block_size)
                .magic(magic)
                .sync_on_write(false)
        })
}

/// Applies `ops` to an in-memory model of the protected file.
///
/// Writes past the end extend the model, zero-filling any gap.
pub fn apply_writes(model: &mut Vec<u8>, ops: &[WriteOp]) {
    for op in ops {
        if op.data.is_empty() {
            continue;
        }
        let start = op.offset as usize;
        let end = start + op.data.len();
        if end > model.len() {
            model.resize(end, 0);
        }
        model[start..end].copy_from_slice(&op.data);
    }
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
