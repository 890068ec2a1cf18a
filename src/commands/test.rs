use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use bra_core::session;

use crate::commands::resolve_archive_path;

#[derive(Parser, Debug)]
#[command(about = "Verify an archive's integrity without extracting")]
pub struct Cli {
    /// Archive to verify (plain or self-extracting)
    pub archive: PathBuf,
}

pub fn cmd_test(argv: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(argv);

    let archive = resolve_archive_path(&cli.archive);
    session::test(&archive)
        .with_context(|| format!("testing {}", archive.display()))?;

    println!("{}: OK", archive.display());
    Ok(())
}
