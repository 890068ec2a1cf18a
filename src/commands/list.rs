use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use bra_core::format::{Compression, EntryType};
use bra_core::session;

use crate::commands::resolve_archive_path;

#[derive(Parser, Debug)]
#[command(about = "List an archive's entries without extracting")]
pub struct Cli {
    /// Archive to read (plain or self-extracting)
    pub archive: PathBuf,
}

pub fn cmd_list(argv: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(argv);

    let archive = resolve_archive_path(&cli.archive);
    let entries = session::list(&archive)
        .with_context(|| format!("listing {}", archive.display()))?;

    for entry in &entries {
        let kind = match entry.entry_type {
            EntryType::File => "file",
            EntryType::Dir | EntryType::Subdir => "dir",
            EntryType::Symlink => "link",
        };
        let compression = match entry.compression {
            Compression::Stored => "stored",
            Compression::Compressed => "compressed",
        };
        println!("{kind:<4} {compression:<10} {:>10} {:#010x}  {}", entry.data_size, entry.crc, entry.path);
    }

    println!("{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
    Ok(())
}
