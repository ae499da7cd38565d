#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::path::Path;

use clap::Parser;

use super::*;

fn run_args(argv: &[&str]) -> RunArgs {
    let cli = Cli::try_parse_from(argv).unwrap();
    match cli.command {
        Some(Command::Run(args)) => args,
        _ => panic!("expected run command"),
    }
}

#[test]
fn parse_bare_invocation() {
    let cli = Cli::parse_from(["tally"]);
    assert!(cli.command.is_none());
    assert!(cli.config.is_none());
}

#[test]
fn parse_discover_command() {
    let cli = Cli::parse_from(["tally", "discover"]);
    let Some(Command::Discover(args)) = cli.command else {
        panic!("expected discover command");
    };
    assert!(args.root.is_none());
    assert_eq!(args.output, OutputFormat::Text);
    assert_eq!(args.color, ColorArg::Auto);
}

#[test]
fn parse_discover_with_root_and_json() {
    let cli = Cli::parse_from(["tally", "discover", "proj", "-o", "json"]);
    let Some(Command::Discover(args)) = cli.command else {
        panic!("expected discover command");
    };
    assert_eq!(args.root.as_deref(), Some(Path::new("proj")));
    assert_eq!(args.output, OutputFormat::Json);
}

#[test]
fn run_without_label_targets_suite() {
    let args = run_args(&["tally", "run"]);
    assert_eq!(args.target(), RunTarget::Suite);
    assert!(!args.failed);
    assert!(!args.failfast);
}

#[test]
fn run_with_label_and_root() {
    let args = run_args(&["tally", "run", "billing.tests", "proj", "--failfast"]);
    assert_eq!(args.target(), RunTarget::Node("billing.tests".to_string()));
    assert_eq!(args.root.as_deref(), Some(Path::new("proj")));
    assert!(args.failfast);
}

#[test]
fn failed_conflicts_with_label() {
    assert!(Cli::try_parse_from(["tally", "run", "billing", "--failed"]).is_err());
}

#[test]
fn global_config_flag() {
    let cli = Cli::parse_from(["tally", "run", "-C", "ci/tally.toml"]);
    assert_eq!(cli.config.as_deref(), Some(Path::new("ci/tally.toml")));
}

#[test]
fn color_flag_values() {
    let args = run_args(&["tally", "run", "--color", "never"]);
    assert_eq!(args.color, ColorArg::Never);
    assert!(Cli::try_parse_from(["tally", "run", "--color", "sometimes"]).is_err());
}

#[test]
fn resolve_root_variants() {
    let cwd = Path::new("/work");
    assert_eq!(resolve_root(None, cwd), Path::new("/work"));
    assert_eq!(resolve_root(Some(Path::new("proj")), cwd), Path::new("/work/proj"));
    assert_eq!(resolve_root(Some(Path::new("/abs")), cwd), Path::new("/abs"));
}
