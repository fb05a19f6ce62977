//! txfile CLI
//!
//! Command-line tools for txfile journals.
//!
//! # Commands
//!
//! - `inspect` - List journal entries, newest first
//! - `verify` - Check that a journal scans cleanly back to its root sentinel
//! - `rollback` - Roll a pending session back and remove its journal
//! - `commit` - Make a pending session permanent and remove its journal

mod commands;

use clap::{Parser, Subcommand};
use commands::JournalTarget;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use txfile_core::JournalConfig;

/// txfile command-line journal tools.
#[derive(Parser)]
#[command(name = "txfile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the protected file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Journal path (defaults to the protected path plus ".journal")
    #[arg(global = true, short, long)]
    journal: Option<PathBuf>,

    /// Descriptor link size in bytes
    #[arg(global = true, long, default_value_t = JournalConfig::DEFAULT_LINK_SIZE)]
    link_size: usize,

    /// Descriptor magic, decimal or 0x-prefixed hex
    #[arg(global = true, long, value_parser = parse_magic, default_value = "0x54584A4E")]
    magic: u32,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List journal entries, newest first
    Inspect {
        /// Maximum number of entries to list
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check that the journal scans back to its root sentinel
    Verify,

    /// Roll the pending session back and remove its journal
    Rollback,

    /// Make the pending session permanent and remove its journal
    Commit,

    /// Show version information
    Version,
}

fn parse_magic(value: &str) -> Result<u32, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid magic '{value}': {e}"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("txfile CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("txfile core v{}", txfile_core::VERSION);
        return Ok(());
    }

    let path = cli.path.ok_or("Protected file path required (--path)")?;
    let config = JournalConfig::new()
        .link_size(cli.link_size)
        .magic(cli.magic);
    config.validate()?;
    let target = JournalTarget::new(path, cli.journal, config);

    match cli.command {
        Commands::Inspect { limit, format } => commands::inspect::run(&target, limit, &format)?,
        Commands::Verify => commands::verify::run(&target)?,
        Commands::Rollback => commands::recover::rollback(&target)?,
        Commands::Commit => commands::recover::commit(&target)?,
        Commands::Version => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_parses_hex_and_decimal() {
        assert_eq!(parse_magic("0x54584A4E"), Ok(0x5458_4A4E));
        assert_eq!(parse_magic("0Xff"), Ok(255));
        assert_eq!(parse_magic("42"), Ok(42));
        assert!(parse_magic("0xZZ").is_err());
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "txfile",
            "inspect",
            "--path",
            "data.bin",
            "--link-size",
            "4",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.path, Some(PathBuf::from("data.bin")));
        assert_eq!(cli.link_size, 4);
        assert_eq!(cli.magic, JournalConfig::DEFAULT_MAGIC);
        assert!(matches!(cli.command, Commands::Inspect { ref format, .. } if format == "json"));
    }
}
