//! Session-level integration harness.
//!
//! [`SessionHarness`] drives a [`TransactionalFile`] while tracking two
//! models: the contents as of the last commit and the contents expected
//! right now. Every operation checks the real file against them.

use crate::fixtures::ScratchFile;
use crate::generators::{apply_writes, WriteOp};
use txfile_core::{JournalConfig, TransactionalFile};

/// A transactional session checked against an in-memory model.
pub struct SessionHarness {
    scratch: ScratchFile,
    config: JournalConfig,
    file: Option<TransactionalFile>,
    committed: Vec<u8>,
    current: Vec<u8>,
}

impl SessionHarness {
    /// Opens a session over a scratch file holding `contents`.
    pub fn new(contents: &[u8], config: JournalConfig) -> Self {
        let scratch = ScratchFile::new(contents);
        let file = scratch.open(config.clone()).expect("Failed to open session");
        Self {
            scratch,
            config,
            file: Some(file),
            committed: contents.to_vec(),
            current: contents.to_vec(),
        }
    }

    /// Returns the live session.
    pub fn file(&mut self) -> &mut TransactionalFile {
        self.file.as_mut().expect("Session already closed")
    }

    /// Writes `data` at `offset` and updates the model.
    pub fn write(&mut self, offset: u64, data: &[u8]) {
        self.file().write_at(offset, data).expect("Failed to write");
        apply_writes(
            &mut self.current,
            &[WriteOp {
                offset,
                data: data.to_vec(),
            }],
        );
        self.verify();
    }

    /// Commits and moves the rollback baseline to the current contents.
    pub fn comit(&mut self) {
        self.file().comit().expect("Failed to commit");
        self.committed = self.current.clone();
        self.verify();
    }

    /// Rolls back and checks the file matches the last commit.
    pub fn rollback(&mut self) {
        self.file().rollback().expect("Failed to roll back");
        self.current = self.committed.clone();
        self.verify();
    }

    /// Drops the session without closing it and opens a new one, as a
    /// restarted process would.
    pub fn restart(&mut self) {
        self.file = None;
        let file = self
            .scratch
            .open(self.config.clone())
            .expect("Failed to reopen session");
        assert_eq!(
            file.original_length(),
            self.committed.len() as u64,
            "Resumed session has the wrong original length"
        );
        self.file = Some(file);
        self.verify();
    }

    /// Closes the session and checks the final contents.
    pub fn close(mut self) -> ScratchFile {
        if let Some(file) = self.file.take() {
            file.close().expect("Failed to close session");
        }
        assert_eq!(self.scratch.contents(), self.current, "Contents after close");
        self.scratch
    }

    /// Asserts the protected file matches the current model.
    pub fn verify(&self) {
        assert_eq!(
            self.scratch.contents(),
            self.current,
            "Protected file diverged from model"
        );
    }

    /// Returns the contents expected right now.
    pub fn expected(&self) -> &[u8] {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::quiet_config;

    #[test]
    fn write_commit_rollback_cycle() {
        let mut harness = SessionHarness::new(b"0123456789", quiet_config());
        harness.write(0, b"ab");
        harness.comit();
        harness.write(8, b"WXYZ");
        harness.write(1, b"?");
        harness.rollback();

        assert_eq!(harness.expected(), b"ab23456789");
        harness.close();
    }

    #[test]
    fn restart_resumes_and_rolls_back() {
        let mut harness = SessionHarness::new(b"abcdef", quiet_config());
        harness.write(2, b"CD");
        harness.restart();
        harness.write(5, b"FGH");
        harness.rollback();

        assert_eq!(harness.expected(), b"abcdef");
    }

    #[test]
    fn restart_after_commit_keeps_commit() {
        let mut harness = SessionHarness::new(b"abc", quiet_config());
        harness.write(3, b"def");
        harness.comit();
        harness.write(0, b"X");
        harness.restart();
        harness.rollback();

        let scratch = harness.close();
        assert_eq!(scratch.contents(), b"abcdef");
    }

    #[test]
    fn many_small_writes_with_small_blocks() {
        let config = quiet_config().block_size(3).link_size(4);
        let mut harness = SessionHarness::new(&[0x55; 200], config);
        for i in 0..50u64 {
            harness.write(i * 7 % 230, &[i as u8; 9]);
        }
        harness.rollback();

        assert_eq!(harness.expected(), &[0x55; 200][..]);
    }
}
