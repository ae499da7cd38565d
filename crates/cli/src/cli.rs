// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument parsing with clap derive.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::target::RunTarget;

/// Discovers unittest-style tests and tracks their status live while they run
#[derive(Parser)]
#[command(name = "tally")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Use specific config file
    #[arg(short = 'C', long = "config", global = true, env = "TALLY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Discover tests and print the test tree
    Discover(DiscoverArgs),
    /// Run tests and report per-test status as it changes
    Run(RunArgs),
}

#[derive(clap::Args)]
pub struct DiscoverArgs {
    /// Project root (default: current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub output: OutputFormat,

    /// When to use color
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorArg,

    /// Show source locations next to each node
    #[arg(long)]
    pub locations: bool,
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Dotted path of the test, class, module or folder to run (default: all)
    #[arg(value_name = "LABEL")]
    pub label: Option<String>,

    /// Project root (default: current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Run the suite, then re-run only the tests that failed
    #[arg(long, conflicts_with = "label")]
    pub failed: bool,

    /// Stop at the first failure
    #[arg(long)]
    pub failfast: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub output: OutputFormat,

    /// When to use color
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorArg,

    /// Do not print transitions while the run is in progress
    #[arg(short, long)]
    pub quiet: bool,
}

impl RunArgs {
    /// The target selected by the positional label.
    pub fn target(&self) -> RunTarget {
        match &self.label {
            Some(label) => RunTarget::Node(label.clone()),
            None => RunTarget::Suite,
        }
    }
}

/// Resolve an optional root argument against `cwd`.
pub fn resolve_root(root: Option<&Path>, cwd: &Path) -> PathBuf {
    match root {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => cwd.to_path_buf(),
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorArg {
    #[default]
    Auto,
    Always,
    Never,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
