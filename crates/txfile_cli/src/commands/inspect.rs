//! Inspect command implementation.

use super::JournalTarget;
use serde::Serialize;
use txfile_core::journal::{read_root, JournalEntry, SegmentScanner};
use txfile_storage::{FileBackend, StorageBackend};

/// One journal entry as shown to the user.
#[derive(Debug, Serialize)]
pub struct EntryInfo {
    /// "root" or "segment".
    pub kind: &'static str,
    /// Journal offset of the footer.
    pub footer_position: u64,
    /// Protected-file offset the payload came from (segments only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_offset: Option<u64>,
    /// Payload bytes (segments only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_length: Option<u64>,
    /// Session length recorded by the root sentinel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_length: Option<u64>,
}

impl From<JournalEntry> for EntryInfo {
    fn from(entry: JournalEntry) -> Self {
        match entry {
            JournalEntry::Root {
                original_length,
                footer_position,
            } => Self {
                kind: "root",
                footer_position,
                source_offset: None,
                payload_length: None,
                original_length: Some(original_length),
            },
            JournalEntry::Segment {
                source_offset,
                payload_length,
                footer_position,
            } => Self {
                kind: "segment",
                footer_position,
                source_offset: Some(source_offset),
                payload_length: Some(payload_length),
                original_length: None,
            },
        }
    }
}

/// Journal summary.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Journal path.
    pub journal: String,
    /// Journal size in bytes.
    pub journal_size: u64,
    /// Descriptor link size.
    pub link_size: usize,
    /// Descriptor magic.
    pub magic: String,
    /// Protected-file length when the session started.
    pub original_length: u64,
    /// Number of entries listed.
    pub entries_shown: usize,
    /// Total preserved payload bytes among the listed entries.
    pub preserved_bytes: u64,
    /// Entries, newest first.
    pub entries: Vec<EntryInfo>,
}

/// Runs the inspect command.
pub fn run(
    target: &JournalTarget,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    target.require_journal()?;
    let result = collect(target, limit)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }

    Ok(())
}

fn collect(
    target: &JournalTarget,
    limit: Option<usize>,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let config = target.config();
    let codec = config.codec();
    let journal = FileBackend::open_read_only(target.journal())?;
    let original_length = read_root(&journal, codec)?;

    let mut entries = Vec::new();
    for entry in SegmentScanner::from_end(&journal, codec)? {
        if limit.is_some_and(|max| entries.len() >= max) {
            break;
        }
        entries.push(EntryInfo::from(entry?));
    }

    let preserved_bytes = entries.iter().filter_map(|e| e.payload_length).sum();
    Ok(InspectResult {
        journal: target.journal().display().to_string(),
        journal_size: journal.size()?,
        link_size: config.link_size,
        magic: format!("0x{:08X}", config.magic),
        original_length,
        entries_shown: entries.len(),
        preserved_bytes,
        entries,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Journal: {}", result.journal);
    println!("  Size: {} bytes", result.journal_size);
    println!("  Link size: {}", result.link_size);
    println!("  Magic: {}", result.magic);
    println!("  Original length: {} bytes", result.original_length);
    println!(
        "  Entries shown: {} ({} preserved bytes)",
        result.entries_shown, result.preserved_bytes
    );
    println!();

    for entry in &result.entries {
        match (entry.source_offset, entry.payload_length, entry.original_length) {
            (Some(offset), Some(len), _) => println!(
                "  @{:>10}  segment  source={} len={}",
                entry.footer_position, offset, len
            ),
            (_, _, Some(original)) => println!(
                "  @{:>10}  root     original_length={}",
                entry.footer_position, original
            ),
            _ => {}
        }
    }
}
