//! `chash` entry point.

use chash_cli::{exit_code, setup_tracing, CliConfig};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = CliConfig::parse();
    setup_tracing(cli.log_level());

    let result = cli
        .ring_config()
        .and_then(|config| cli.command.execute(&config, &mut std::io::stdout().lock()));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}
