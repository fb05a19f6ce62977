//! Golden journal vectors.
//!
//! Each vector describes a protected file, a sequence of writes and the
//! exact journal bytes those writes must produce with the default
//! configuration. Other implementations of the journal format can load the
//! JSON form and check themselves against it.

use crate::fixtures::{quiet_config, ScratchFile};
use serde::{Deserialize, Serialize};

/// A write within a journal vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorWrite {
    /// Offset of the write.
    pub offset: u64,
    /// Written bytes (hex-encoded).
    pub data_hex: String,
}

/// A journal test vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Protected file contents at open (hex-encoded).
    pub original_hex: String,
    /// Writes performed, in order.
    pub writes: Vec<VectorWrite>,
    /// Expected journal contents after the writes (hex-encoded).
    pub expected_journal_hex: String,
    /// Expected protected file length after the writes.
    pub expected_length: u64,
}

/// Root sentinel for a 100-byte file with the default configuration.
const ROOT_100: &str = "00000000000000640000000054584a4e54584a4e";

/// Journal vectors for the default configuration.
pub fn journal_vectors() -> Vec<JournalVector> {
    let zeros_100 = "00".repeat(100);
    vec![
        JournalVector {
            id: "root_only".into(),
            description: "Freshly opened journal holds just the root sentinel".into(),
            original_hex: zeros_100.clone(),
            writes: vec![],
            expected_journal_hex: ROOT_100.into(),
            expected_length: 100,
        },
        JournalVector {
            id: "overwrite_inside".into(),
            description: "Five 0xFF bytes at offset 10 preserve five zero bytes".into(),
            original_hex: zeros_100.clone(),
            writes: vec![VectorWrite {
                offset: 10,
                data_hex: "ff".repeat(5),
            }],
            expected_journal_hex: format!(
                "{ROOT_100}0000000000{}",
                "000000000000000a000000000000000554584a4e"
            ),
            expected_length: 100,
        },
        JournalVector {
            id: "straddle_end".into(),
            description: "Ten bytes at offset 98 preserve only the two that existed".into(),
            original_hex: zeros_100.clone(),
            writes: vec![VectorWrite {
                offset: 98,
                data_hex: "ab".repeat(10),
            }],
            expected_journal_hex: format!(
                "{ROOT_100}0000{}",
                "0000000000000062000000000000000254584a4e"
            ),
            expected_length: 108,
        },
        JournalVector {
            id: "pure_append".into(),
            description: "A write at the original length preserves nothing".into(),
            original_hex: zeros_100,
            writes: vec![VectorWrite {
                offset: 100,
                data_hex: "01020304".into(),
            }],
            expected_journal_hex: ROOT_100.into(),
            expected_length: 104,
        },
    ]
}

/// Returns all vectors as a JSON string.
pub fn all_vectors_json() -> String {
    serde_json::to_string_pretty(&journal_vectors()).expect("Failed to serialize vectors")
}

/// Runs `vector` against a scratch file and returns the produced journal and
/// protected length.
pub fn run_vector(vector: &JournalVector) -> (Vec<u8>, u64) {
    let config = quiet_config();
    let scratch = ScratchFile::new(&from_hex(&vector.original_hex));
    let mut file = scratch.open(config.clone()).expect("Failed to open session");
    for write in &vector.writes {
        file.write_at(write.offset, &from_hex(&write.data_hex))
            .expect("Failed to write");
    }
    let length = file.len().expect("Failed to read length");
    (scratch.journal_contents(&config), length)
}

/// Decodes a lowercase or uppercase hex string.
pub fn from_hex(hex: &str) -> Vec<u8> {
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("Invalid hex"))
        .collect()
}

/// Encodes bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
