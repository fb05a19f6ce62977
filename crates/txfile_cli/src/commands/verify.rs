//! Verify command implementation.

use super::JournalTarget;
use txfile_core::journal::{read_root, JournalEntry, SegmentScanner};
use txfile_storage::FileBackend;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of segments checked.
    pub segments_checked: usize,
    /// Number of segments that passed every check.
    pub valid_segments: usize,
    /// Valid segments with no payload, written when the file ended before
    /// the overwritten offset.
    pub empty_segments: usize,
    /// Whether the scan ended at a root sentinel at offset 0.
    pub root_found: bool,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.root_found && self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(target: &JournalTarget) -> Result<(), Box<dyn std::error::Error>> {
    target.require_journal()?;
    println!("Verifying journal at {:?}", target.journal());
    println!();

    let result = verify(target)?;
    println!("  Segments checked: {}", result.segments_checked);
    println!("  Valid segments: {}", result.valid_segments);
    if result.empty_segments > 0 {
        println!("  Empty segments: {}", result.empty_segments);
    }
    for error in &result.errors {
        println!("  Error: {}", error);
    }

    println!();
    if result.is_ok() {
        println!("✓ Journal verification passed");
        Ok(())
    } else {
        println!("✗ Journal verification failed");
        Err("Verification failed".into())
    }
}

fn verify(target: &JournalTarget) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let codec = target.config().codec();
    let journal = FileBackend::open_read_only(target.journal())?;
    let mut result = VerifyResult::default();

    let original_length = match read_root(&journal, codec) {
        Ok(len) => len,
        Err(e) => {
            result.errors.push(e.to_string());
            return Ok(result);
        }
    };

    for entry in SegmentScanner::from_end(&journal, codec)? {
        match entry {
            Ok(JournalEntry::Segment {
                source_offset,
                payload_length,
                footer_position,
            }) => {
                result.segments_checked += 1;
                if source_offset >= original_length {
                    result.errors.push(format!(
                        "Segment at {} preserves offset {} beyond original length {}",
                        footer_position, source_offset, original_length
                    ));
                } else {
                    if payload_length == 0 {
                        result.empty_segments += 1;
                    }
                    result.valid_segments += 1;
                }
            }
            Ok(JournalEntry::Root {
                footer_position, ..
            }) => {
                if footer_position == 0 {
                    result.root_found = true;
                } else {
                    result.errors.push(format!(
                        "Root sentinel found at {} instead of journal start",
                        footer_position
                    ));
                }
            }
            Err(e) => result.errors.push(e.to_string()),
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use txfile_core::{JournalConfig, TransactionalFile};

    fn pending_session(dir: &TempDir) -> JournalTarget {
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"0123456789").unwrap();
        let config = JournalConfig::new().sync_on_write(false);

        let mut file = TransactionalFile::open(&path, config.clone()).unwrap();
        file.write_at(2, b"xx").unwrap();
        file.write_at(8, b"tail!").unwrap();
        drop(file);

        JournalTarget::new(path, None, config)
    }

    #[test]
    fn clean_journal_verifies() {
        let dir = TempDir::new().unwrap();
        let target = pending_session(&dir);

        let result = verify(&target).unwrap();
        assert!(result.is_ok(), "{:?}", result.errors);
        assert_eq!(result.segments_checked, 2);
        assert_eq!(result.valid_segments, 2);
    }

    #[test]
    fn garbage_journal_fails() {
        let dir = TempDir::new().unwrap();
        let target = pending_session(&dir);
        std::fs::write(target.journal(), [0x11; 40]).unwrap();

        let result = verify(&target).unwrap();
        assert!(!result.is_ok());
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn torn_tail_still_verifies() {
        let dir = TempDir::new().unwrap();
        let target = pending_session(&dir);
        let mut journal = std::fs::OpenOptions::new()
            .append(true)
            .open(target.journal())
            .unwrap();
        journal.write_all(&[0x5A; 7]).unwrap();

        let result = verify(&target).unwrap();
        assert!(result.is_ok(), "{:?}", result.errors);
        assert_eq!(result.segments_checked, 2);
    }

    #[test]
    fn empty_segment_verifies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, [1u8; 10]).unwrap();
        let config = JournalConfig::new().sync_on_write(false);

        drop(TransactionalFile::open(&path, config.clone()).unwrap());
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(4)
            .unwrap();
        let mut file = TransactionalFile::open(&path, config.clone()).unwrap();
        file.write_at(6, b"zz").unwrap();
        drop(file);

        let target = JournalTarget::new(path, None, config);
        let result = verify(&target).unwrap();
        assert!(result.is_ok(), "{:?}", result.errors);
        assert_eq!(result.segments_checked, 1);
        assert_eq!(result.empty_segments, 1);
    }
}
