// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Parse helper functions for configuration.

use std::path::Path;

/// Known keys per section.
const KNOWN_DISCOVERY_KEYS: &[&str] = &[
    "pattern",
    "exclude",
    "method_prefix",
    "class_prefix",
    "base_classes",
];
const KNOWN_RUNNER_KEYS: &[&str] = &[
    "command",
    "args",
    "fail_fast",
    "fail_fast_arg",
    "cwd",
    "env",
];
const KNOWN_REFRESH_KEYS: &[&str] = &["interval_ms"];

/// Collect `section.key` names that no section recognizes.
///
/// `runner.env` is a free-form table and is never inspected.
pub(super) fn collect_unknown_keys(raw: &toml::Table) -> Vec<String> {
    let sections: [(&str, &[&str]); 3] = [
        ("discovery", KNOWN_DISCOVERY_KEYS),
        ("runner", KNOWN_RUNNER_KEYS),
        ("refresh", KNOWN_REFRESH_KEYS),
    ];

    let mut unknown = Vec::new();
    for (section, known) in sections {
        let Some(toml::Value::Table(table)) = raw.get(section) else {
            continue;
        };
        for key in table.keys() {
            if !known.contains(&key.as_str()) {
                unknown.push(format!("{section}.{key}"));
            }
        }
    }
    unknown
}

/// Warn about unknown configuration key.
pub(super) fn warn_unknown_key(path: &Path, key: &str) {
    tracing::warn!("{}: unrecognized field `{}`", path.display(), key);
    eprintln!(
        "tally: warning: {}: unrecognized field `{}` (ignored)",
        path.display(),
        key
    );
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
