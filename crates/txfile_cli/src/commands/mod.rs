//! CLI command implementations.

pub mod inspect;
pub mod recover;
pub mod verify;

use std::path::{Path, PathBuf};
use txfile_core::JournalConfig;

/// A protected file, its journal and the configuration to read it with.
#[derive(Debug, Clone)]
pub struct JournalTarget {
    path: PathBuf,
    journal: PathBuf,
    config: JournalConfig,
}

impl JournalTarget {
    /// Resolves the journal path, defaulting to the protected path plus the
    /// configured suffix.
    pub fn new(path: PathBuf, journal: Option<PathBuf>, config: JournalConfig) -> Self {
        let journal = journal.unwrap_or_else(|| config.journal_path_for(&path));
        Self {
            path,
            journal,
            config,
        }
    }

    /// Protected file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Journal path.
    pub fn journal(&self) -> &Path {
        &self.journal
    }

    /// Journal configuration.
    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// Fails unless a journal exists at the resolved path.
    pub fn require_journal(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.journal.exists() {
            Ok(())
        } else {
            Err(format!("No journal found at {:?}", self.journal).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_defaults_to_suffix() {
        let target = JournalTarget::new(PathBuf::from("data.bin"), None, JournalConfig::new());
        assert_eq!(target.journal(), Path::new("data.bin.journal"));
    }

    #[test]
    fn explicit_journal_wins() {
        let target = JournalTarget::new(
            PathBuf::from("data.bin"),
            Some(PathBuf::from("/tmp/other")),
            JournalConfig::new(),
        );
        assert_eq!(target.journal(), Path::new("/tmp/other"));
    }

    #[test]
    fn missing_journal_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = JournalTarget::new(dir.path().join("data.bin"), None, JournalConfig::new());
        assert!(target.require_journal().is_err());
    }
}
