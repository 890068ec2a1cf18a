use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use bra_core::filename;
use bra_core::path::sanitize;
use bra_core::session::{self, CompressionRequest, CreateOptions};

#[derive(Parser, Debug)]
#[command(about = "Pack files and directories into a single archive")]
pub struct Cli {
    /// Archive to create
    pub archive: PathBuf,

    /// Files and/or directories to add, relative to the current directory
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Recurse into directories given as inputs
    #[arg(short, long)]
    pub recursive: bool,

    /// Store files verbatim instead of compressing them
    #[arg(long)]
    pub store: bool,

    /// Produce a self-extracting archive by prepending this stub executable
    #[arg(long, value_name = "STUB")]
    pub sfx: Option<PathBuf>,
}

pub fn cmd_create(argv: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(argv);
    let cwd = std::env::current_dir().context("reading current directory")?;

    let inputs = cli
        .inputs
        .iter()
        .map(|p| sanitize(&cwd, p))
        .collect::<Result<Vec<_>, _>>()?;

    // spec §6's "helper adjusters": a plain archive always ends up named
    // `.BRa`; an SFX archive gets the host's executable extension on top
    // of that (`.brx` on POSIX, `.exe` on Windows), matching the original
    // program's `filename_archive_adjust`/`filename_sfx_adjust`.
    let archive = if cli.sfx.is_some() { filename::adjust_sfx_name(&cli.archive) } else { filename::adjust_archive_name(&cli.archive) };

    let options = CreateOptions {
        sfx: cli.sfx.is_some(),
        recursive: cli.recursive,
        compression: if cli.store { CompressionRequest::Stored } else { CompressionRequest::Compressed },
        stub_path: cli.sfx,
    };

    session::create(&cwd, &archive, &inputs, &options)
        .with_context(|| format!("creating archive {}", archive.display()))?;

    log::info!("wrote {} ({} entr{})", archive.display(), inputs.len(), if inputs.len() == 1 { "y" } else { "ies" });
    Ok(())
}
