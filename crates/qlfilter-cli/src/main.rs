//! `qlfilter` developer CLI: list fields, parse, compile, render and
//! evaluate filters against a TOML schema configuration.

mod cli;
mod commands;
mod entities;
mod error;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;

const ENV_LOG: &str = "QLFILTER_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match commands::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,qlfilter=debug,qlfilter_core=debug"
    } else {
        "warn"
    };

    let filter = std::env::var(ENV_LOG)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_filter.to_string());

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_env_filter(filter)
        .init();
}
