// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn config_error_display() {
    let err = Error::Config {
        message: "invalid version".into(),
        path: Some(PathBuf::from("tally.toml")),
    };
    assert!(err.to_string().contains("invalid version"));
}

#[test]
fn spawn_error_names_the_command() {
    let err = Error::Spawn {
        command: "python".into(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
    };
    let msg = err.to_string();
    assert!(msg.contains("`python`"), "got: {msg}");
    assert!(msg.contains("not found"), "got: {msg}");
}

#[parameterized(
    config = { Error::Config { message: "x".into(), path: None }, ExitCode::ConfigError },
    argument = { Error::Argument("x".into()), ExitCode::ConfigError },
    internal = { Error::Internal("x".into()), ExitCode::InternalError },
    no_tests = { Error::NoTests, ExitCode::Success },
)]
fn exit_code_mapping(err: Error, expected: ExitCode) {
    assert_eq!(ExitCode::from(&err), expected);
}

#[test]
fn io_error_maps_to_internal() {
    let err = Error::Io {
        path: PathBuf::from("tests/test_app.py"),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
    };
    assert_eq!(ExitCode::from(&err), ExitCode::InternalError);
    assert!(err.to_string().contains("tests/test_app.py"));
}
