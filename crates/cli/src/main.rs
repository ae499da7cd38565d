// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tally CLI entry point.

use std::path::Path;

use clap::{CommandFactory, Parser};
use tracing_subscriber::{EnvFilter, fmt};

use tally::cli::{Cli, Command};
use tally::config::{self, Config};
use tally::error::ExitCode;

mod cmd_discover;
mod cmd_run;

fn init_logging() {
    let filter = EnvFilter::try_from_env(tally::env::names::TALLY_LOG)
        .unwrap_or_else(|_| EnvFilter::new("off"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();

    let exit_code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("tally: {}", e);
            match e.downcast_ref::<tally::Error>() {
                Some(err) => ExitCode::from(err),
                None => ExitCode::InternalError,
            }
        }
    };

    std::process::exit(exit_code as i32);
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match &cli.command {
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(ExitCode::Success)
        }
        Some(Command::Discover(args)) => cmd_discover::run(&cli, args),
        Some(Command::Run(args)) => cmd_run::run(&cli, args),
    }
}

/// Load the explicit config, or the one found from `root`, or defaults.
pub(crate) fn load_config(cli: &Cli, root: &Path) -> anyhow::Result<Config> {
    match config::resolve_config(cli.config.as_deref(), root)? {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            Ok(config::load_with_warnings(&path)?)
        }
        None => {
            tracing::debug!("no config found, using defaults");
            Ok(Config::default())
        }
    }
}
