//! GNOMAN CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use gnoman_cli::{init_logging, load_config, render, run, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", render::error_line(&e));
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging, cli.verbose);

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", render::error_line(&e));
            ExitCode::FAILURE
        }
    }
}
