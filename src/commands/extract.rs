use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use bra_core::session::{self, ExtractOptions, OverwriteController, OverwriteDecision, OverwritePolicy};

use crate::commands::resolve_archive_path;

#[derive(Parser, Debug)]
#[command(about = "Extract an archive's contents")]
pub struct Cli {
    /// Archive to read (plain or self-extracting)
    pub archive: PathBuf,

    /// Directory to extract into (created if it doesn't exist)
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Overwrite existing files without asking
    #[arg(short = 'y', long, conflicts_with = "never")]
    pub yes: bool,

    /// Never overwrite existing files; skip them silently
    #[arg(short = 'n', long)]
    pub never: bool,
}

pub fn cmd_extract(argv: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(argv);

    let initial = if cli.yes {
        OverwritePolicy::AlwaysYes
    } else if cli.never {
        OverwritePolicy::AlwaysNo
    } else {
        OverwritePolicy::Ask
    };

    let overwrite = OverwriteController::new(initial, prompt_overwrite);
    let options = ExtractOptions { overwrite };

    let archive = resolve_archive_path(&cli.archive);
    session::extract(&archive, &cli.output, &options)
        .with_context(|| format!("extracting {}", archive.display()))?;

    log::info!("extracted into {}", cli.output.display());
    Ok(())
}

/// Interactive overwrite prompt: the core never touches stdin itself
/// (spec §9), the CLI layer owns this closure and escalates the shared
/// policy when the user answers "all" or "none".
fn prompt_overwrite(path: &std::path::Path) -> (OverwriteDecision, Option<OverwritePolicy>) {
    loop {
        eprint!("overwrite {}? [y]es/[n]o/[A]ll/[N]one: ", path.display());
        let _ = io::stderr().flush();

        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() || line.is_empty() {
            return (OverwriteDecision::Skip, Some(OverwritePolicy::AlwaysNo));
        }

        match line.trim() {
            "y" | "Y" | "yes" => return (OverwriteDecision::Overwrite, None),
            "n" | "no" => return (OverwriteDecision::Skip, None),
            "A" | "all" => return (OverwriteDecision::Overwrite, Some(OverwritePolicy::AlwaysYes)),
            "N" | "none" => return (OverwriteDecision::Skip, Some(OverwritePolicy::AlwaysNo)),
            _ => eprintln!("please answer y, n, A, or N"),
        }
    }
}
