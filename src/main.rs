mod commands;

use std::io::stdout;
use std::process::ExitCode;

use clap::Parser;
use clap_complete::generate;

use commands::{Cli, Subcommands};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    let cli = Cli::parse_from(args.clone());

    let is_sfx_create = matches!(&cli.subcommands, Subcommands::Create(c) if c.sfx.is_some());

    let result = match cli.subcommands {
        Subcommands::Create(_) => commands::cmd_create(args[1..].to_vec()),
        Subcommands::Extract(_) => commands::cmd_extract(args[1..].to_vec()),
        Subcommands::List(_) => commands::cmd_list(args[1..].to_vec()),
        Subcommands::Test(_) => commands::cmd_test(args[1..].to_vec()),
        Subcommands::Completions { shell } => {
            let mut cmd = commands::build_cli();
            let name = cmd.get_name().to_owned();
            generate(shell, &mut cmd, name, &mut stdout());
            return ExitCode::SUCCESS;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("bra: error: {err:#}");
            ExitCode::from(exit_code_for(&err, is_sfx_create))
        }
    }
}

/// Exit-code convention (spec §6): 0 success; 1 usage/session error; 2
/// SFX-specific I/O error (stub copy, footer write); 3 data error. The
/// library surfaces one `bra_core::Error` per failure, wrapped in
/// `anyhow` context above it, so downcasting recovers the kind this
/// maps on. An `Io` failure during `create --sfx` is assumed to be the
/// stub-copy/footer-write path spec §6 calls out specially; every other
/// `Io` failure is an ordinary usage/session error.
fn exit_code_for(err: &anyhow::Error, is_sfx_create: bool) -> u8 {
    use bra_core::error::Error as CoreError;

    match err.downcast_ref::<CoreError>() {
        Some(CoreError::CrcMismatch { .. } | CoreError::InvalidCodes { .. } | CoreError::OversizedField { .. } | CoreError::Truncated { .. }) => 3,
        Some(CoreError::Io(_)) if is_sfx_create => 2,
        Some(_) => 1,
        None => 1,
    }
}
