// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration parsing and validation.
//!
//! Handles tally.toml parsing with version validation and unknown key warnings.

mod locate;
mod parse;
mod suggest;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub use locate::{find_config, resolve_config};

use crate::error::{Error, Result};
use parse::collect_unknown_keys;
use suggest::warn_unknown_section;

/// Config file name looked up from the working directory.
pub const CONFIG_FILE_NAME: &str = "tally.toml";

/// Supported config version.
pub const SUPPORTED_VERSION: i64 = 1;

/// Minimum config structure for version checking.
#[derive(Deserialize)]
struct VersionOnly {
    version: Option<i64>,
}

/// Full configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Config file version (must be 1).
    pub version: i64,

    /// Test discovery rules.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Backing test runner invocation.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Redraw coalescing.
    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: SUPPORTED_VERSION,
            discovery: DiscoveryConfig::default(),
            runner: RunnerConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

/// Which files are scanned and what counts as a test inside them.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Include glob, relative to the root (default: "**/test*.py").
    #[serde(default = "DiscoveryConfig::default_pattern")]
    pub pattern: String,

    /// Exclude globs applied while walking (prevents I/O on subtrees).
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Prefix that marks a test method or function (default: "test").
    #[serde(default = "DiscoveryConfig::default_method_prefix")]
    pub method_prefix: String,

    /// Prefix that marks a test class by name alone (default: "Test").
    #[serde(default = "DiscoveryConfig::default_class_prefix")]
    pub class_prefix: String,

    /// Base classes that make any subclass a test class.
    #[serde(default = "DiscoveryConfig::default_base_classes")]
    pub base_classes: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            pattern: Self::default_pattern(),
            exclude: Vec::new(),
            method_prefix: Self::default_method_prefix(),
            class_prefix: Self::default_class_prefix(),
            base_classes: Self::default_base_classes(),
        }
    }
}

impl DiscoveryConfig {
    pub(crate) fn default_pattern() -> String {
        "**/test*.py".to_string()
    }

    pub(crate) fn default_method_prefix() -> String {
        "test".to_string()
    }

    pub(crate) fn default_class_prefix() -> String {
        "Test".to_string()
    }

    pub(crate) fn default_base_classes() -> Vec<String> {
        [
            "TestCase",
            "SimpleTestCase",
            "TransactionTestCase",
            "LiveServerTestCase",
            "StaticLiveServerTestCase",
            "IsolatedAsyncioTestCase",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}

/// How the backing runner is invoked.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Executable (default: "python").
    #[serde(default = "RunnerConfig::default_command")]
    pub command: String,

    /// Arguments placed before the selected test labels.
    #[serde(default = "RunnerConfig::default_args")]
    pub args: Vec<String>,

    /// Stop at the first failure.
    #[serde(default)]
    pub fail_fast: bool,

    /// Flag appended when fail-fast is active (default: "--failfast").
    #[serde(default = "RunnerConfig::default_fail_fast_arg")]
    pub fail_fast_arg: String,

    /// Working directory, relative to the project root.
    #[serde(default)]
    pub cwd: Option<String>,

    /// Extra environment variables for the runner.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: Self::default_command(),
            args: Self::default_args(),
            fail_fast: false,
            fail_fast_arg: Self::default_fail_fast_arg(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }
}

impl RunnerConfig {
    pub(crate) fn default_command() -> String {
        "python".to_string()
    }

    pub(crate) fn default_args() -> Vec<String> {
        vec!["-m".to_string(), "unittest".to_string(), "-v".to_string()]
    }

    pub(crate) fn default_fail_fast_arg() -> String {
        "--failfast".to_string()
    }

    /// Resolve the runner working directory against the project root.
    pub fn working_dir(&self, root: &Path) -> PathBuf {
        match &self.cwd {
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        }
    }
}

/// Refresh coalescing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Minimum milliseconds between two refreshes (default: 200).
    #[serde(default = "RefreshConfig::default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: Self::default_interval_ms(),
        }
    }
}

impl RefreshConfig {
    pub(crate) fn default_interval_ms() -> u64 {
        200
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Known top-level sections.
const KNOWN_SECTIONS: &[&str] = &["version", "discovery", "runner", "refresh"];

/// Load config from a file path.
pub fn load(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse(&content, path)
}

/// Load config with warnings for unknown keys.
pub fn load_with_warnings(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_with_warnings(&content, path)
}

/// Parse config from string content (strict mode).
pub fn parse(content: &str, path: &Path) -> Result<Config> {
    // First check version
    let version_check: VersionOnly = toml::from_str(content).map_err(|e| Error::Config {
        message: e.to_string(),
        path: Some(path.to_path_buf()),
    })?;

    let version = version_check.version.ok_or_else(|| Error::Config {
        message: "missing required field: version".to_string(),
        path: Some(path.to_path_buf()),
    })?;

    if version != SUPPORTED_VERSION {
        return Err(Error::Config {
            message: format!(
                "unsupported config version {} (supported: {})\n  Upgrade tally to use this config.",
                version, SUPPORTED_VERSION
            ),
            path: Some(path.to_path_buf()),
        });
    }

    toml::from_str(content).map_err(|e| Error::Config {
        message: e.to_string(),
        path: Some(path.to_path_buf()),
    })
}

/// Parse config, warning on unknown keys.
pub fn parse_with_warnings(content: &str, path: &Path) -> Result<Config> {
    let config = parse(content, path)?;

    let raw: toml::Table = toml::from_str(content).map_err(|e| Error::Config {
        message: e.to_string(),
        path: Some(path.to_path_buf()),
    })?;

    for key in raw.keys() {
        if !KNOWN_SECTIONS.contains(&key.as_str()) {
            warn_unknown_section(path, key);
        }
    }
    for key in collect_unknown_keys(&raw) {
        parse::warn_unknown_key(path, &key);
    }

    Ok(config)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
