use std::path::{Path, PathBuf};

use clap::{Command, CommandFactory, Subcommand};

pub mod create;
pub mod extract;
pub mod list;
pub mod test;

pub use create::cmd_create;
pub use extract::cmd_extract;
pub use list::cmd_list;
pub use test::cmd_test;

/// Resolve a user-supplied archive path the way `extract`/`list`/`test`
/// open archives (spec §6's "helper adjusters"): try `.BRa`, then each
/// SFX variant on top of that, in that order, and fall back to the
/// literal path the user typed if none of those exist — so a later
/// open failure reports exactly what was typed, matching the original
/// program's `parseArgs_adjustFilename` fallback chain.
pub fn resolve_archive_path(path: &Path) -> PathBuf {
    for candidate in bra_core::filename::open_candidates(path) {
        if candidate.exists() {
            return candidate;
        }
    }
    path.to_path_buf()
}

#[derive(clap::Parser, Debug)]
#[command(name = "bra", about = "Pack files into an archive and extract them back")]
pub struct Cli {
    #[command(subcommand)]
    pub subcommands: Subcommands,
}

#[derive(Subcommand, Debug)]
pub enum Subcommands {
    Create(create::Cli),
    Extract(extract::Cli),
    List(list::Cli),
    Test(test::Cli),
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

/// Full command tree, used both to dispatch by name (`main`'s own
/// argv-splitting convention) and to generate `--help`/completions.
pub fn build_cli() -> Command {
    Cli::command()
}
