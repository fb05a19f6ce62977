//! Rollback and commit commands for a session left behind by a crashed
//! process.

use super::JournalTarget;
use tracing::info;
use txfile_core::TransactionalFile;

/// Restores the protected file to its state at session start and removes
/// the journal.
pub fn rollback(target: &JournalTarget) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = resume(target)?;
    let original_length = file.original_length();
    file.rollback()?;
    file.close()?;

    info!(path = %target.path().display(), original_length, "rolled back");
    println!(
        "✓ Rolled back {:?} to {} bytes",
        target.path(),
        original_length
    );
    Ok(())
}

/// Keeps every journaled write and removes the journal.
pub fn commit(target: &JournalTarget) -> Result<(), Box<dyn std::error::Error>> {
    let file = resume(target)?;
    let length = file.len()?;
    file.close()?;

    info!(path = %target.path().display(), length, "committed");
    println!("✓ Committed {:?} at {} bytes", target.path(), length);
    Ok(())
}

fn resume(target: &JournalTarget) -> Result<TransactionalFile, Box<dyn std::error::Error>> {
    target.require_journal()?;
    let config = target.config().clone().keep_journal(false);
    let file = TransactionalFile::open_with_journal(target.path(), target.journal(), config)?;
    Ok(file)
}
