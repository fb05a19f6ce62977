//! Scratch-file fixtures.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use txfile_core::{CoreResult, JournalConfig, TransactionalFile};

/// A protected file in a temporary directory, removed on drop.
pub struct ScratchFile {
    dir: TempDir,
    path: PathBuf,
}

impl ScratchFile {
    /// Creates a scratch file holding `contents`.
    pub fn new(contents: &[u8]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("protected.bin");
        fs::write(&path, contents).expect("Failed to write scratch file");
        Self { dir, path }
    }

    /// Creates a scratch file of `len` zero bytes.
    pub fn zeroed(len: usize) -> Self {
        Self::new(&vec![0u8; len])
    }

    /// Returns the protected file's path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the temporary directory.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the default journal path for `config`.
    pub fn journal_path(&self, config: &JournalConfig) -> PathBuf {
        config.journal_path_for(&self.path)
    }

    /// Reads the protected file's current contents.
    pub fn contents(&self) -> Vec<u8> {
        fs::read(&self.path).expect("Failed to read scratch file")
    }

    /// Reads the journal's current contents.
    pub fn journal_contents(&self, config: &JournalConfig) -> Vec<u8> {
        fs::read(self.journal_path(config)).expect("Failed to read journal")
    }

    /// Opens a transactional session on the scratch file.
    pub fn open(&self, config: JournalConfig) -> CoreResult<TransactionalFile> {
        TransactionalFile::open(&self.path, config)
    }
}

/// Default configuration without per-write fsync, for fast tests.
pub fn quiet_config() -> JournalConfig {
    JournalConfig::new().sync_on_write(false)
}

/// Runs `f` against a fresh session over a scratch file holding `contents`.
///
/// The session is closed afterwards; the scratch file is returned so its
/// final contents can be checked.
pub fn with_session<F>(contents: &[u8], config: JournalConfig, f: F) -> ScratchFile
where
    F: FnOnce(&mut TransactionalFile),
{
    let scratch = ScratchFile::new(contents);
    let mut file = scratch.open(config).expect("Failed to open session");
    f(&mut file);
    file.close().expect("Failed to close session");
    scratch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_file_round_trip() {
        let scratch = ScratchFile::new(b"abc");
        assert_eq!(scratch.contents(), b"abc");
        assert!(scratch.path().starts_with(scratch.dir()));
    }

    #[test]
    fn session_closes_journal() {
        let config = quiet_config();
        let scratch = with_session(b"abc", config.clone(), |file| {
            file.write_at(1, b"X").unwrap();
        });

        assert_eq!(scratch.contents(), b"aXc");
        assert!(!scratch.journal_path(&config).exists());
    }

    #[test]
    fn zeroed_has_length() {
        assert_eq!(ScratchFile::zeroed(17).contents().len(), 17);
    }
}
