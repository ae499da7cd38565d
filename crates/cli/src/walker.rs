// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Parallel test-file walking with gitignore support.
//!
//! Uses the `ignore` crate for efficient, parallel file discovery
//! that respects `.gitignore`, custom exclude patterns, and depth limits.
//! Only files matching the include glob are reported.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use globset::{Glob, GlobMatcher};
use ignore::overrides::{Override, OverrideBuilder};
use ignore::{WalkBuilder, WalkState};

use crate::config::DiscoveryConfig;
use crate::error::{Error, Result};

/// Helper to check if an ignore::Error is a symlink loop error.
fn is_loop_error(err: &ignore::Error) -> bool {
    match err {
        ignore::Error::Loop { .. } => true,
        ignore::Error::WithPath { err, .. } => is_loop_error(err),
        ignore::Error::WithDepth { err, .. } => is_loop_error(err),
        ignore::Error::WithLineNumber { err, .. } => is_loop_error(err),
        _ => false,
    }
}

/// Default maximum directory depth.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Directories to skip entirely during walking.
/// Skipping at the walker level prevents any I/O on these subtrees.
pub(crate) const SKIP_DIRECTORIES: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
];

/// Walker configuration.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Include glob matched against root-relative paths.
    pub include: String,

    /// Exclude patterns (walker-level: prevents I/O on subtrees).
    pub exclude_patterns: Vec<String>,

    /// Maximum directory depth (default: 100).
    pub max_depth: Option<usize>,

    /// Whether to respect gitignore files.
    pub git_ignore: bool,

    /// Whether to skip hidden files.
    pub hidden: bool,

    /// Number of threads (0 = auto).
    pub threads: usize,

    /// Force parallel mode regardless of heuristic.
    pub force_parallel: bool,
}

/// Top-level entry count above which the parallel walker is used.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 100;

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            include: DiscoveryConfig::default_pattern(),
            exclude_patterns: Vec::new(),
            max_depth: Some(DEFAULT_MAX_DEPTH),
            git_ignore: true,
            hidden: true, // Skip hidden files by default
            threads: 0,   // Auto-detect
            force_parallel: false,
        }
    }
}

impl WalkerConfig {
    /// Walker settings for a discovery configuration.
    pub fn from_discovery(config: &DiscoveryConfig) -> Self {
        Self {
            include: config.pattern.clone(),
            exclude_patterns: config.exclude.clone(),
            ..Default::default()
        }
    }
}

/// Test file candidate discovered by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    /// Absolute path to the file.
    pub path: PathBuf,

    /// Path relative to the walk root.
    pub relative: PathBuf,

    /// Directory depth from root.
    pub depth: usize,
}

/// Statistics from a walk operation.
#[derive(Debug, Default, Clone)]
pub struct WalkStats {
    /// Files matching the include glob.
    pub files_found: usize,

    /// Files seen but not matching the include glob.
    pub files_unmatched: usize,

    /// Symlink loops detected.
    pub symlink_loops: usize,

    /// Errors encountered.
    pub errors: usize,
}

/// Parallel file walker with gitignore support.
pub struct FileWalker {
    config: WalkerConfig,
    include: GlobMatcher,
}

/// Per-thread counters shared by the walk callbacks.
#[derive(Default)]
struct Counters {
    found: AtomicUsize,
    unmatched: AtomicUsize,
    loops: AtomicUsize,
    errors: AtomicUsize,
}

impl Counters {
    fn stats(&self) -> WalkStats {
        WalkStats {
            files_found: self.found.load(Ordering::Relaxed),
            files_unmatched: self.unmatched.load(Ordering::Relaxed),
            symlink_loops: self.loops.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// What to do with a single walk entry.
enum Visit {
    Continue,
    Quit,
}

impl FileWalker {
    /// Create a new walker with the given configuration.
    pub fn new(config: WalkerConfig) -> Result<Self> {
        let include = Glob::new(&config.include)
            .map_err(|e| Error::Config {
                message: format!("invalid discovery pattern `{}`: {}", config.include, e),
                path: None,
            })?
            .compile_matcher();
        Ok(Self { config, include })
    }

    /// Determine whether to use parallel walking based on heuristics.
    ///
    /// Uses a quick count of top-level directory entries as a proxy for
    /// total file count, avoiding thread pool overhead on small projects.
    fn should_use_parallel(&self, root: &Path) -> bool {
        if self.config.force_parallel {
            return true;
        }

        let entry_count = std::fs::read_dir(root)
            .map(|entries| entries.count())
            .unwrap_or(0);

        entry_count >= DEFAULT_PARALLEL_THRESHOLD
    }

    fn builder(&self, root: &Path) -> WalkBuilder {
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(self.config.hidden)
            .git_ignore(self.config.git_ignore)
            .git_exclude(true)
            .git_global(true)
            .follow_links(true); // Follow symlinks (ignore crate detects loops)

        if let Some(depth) = self.config.max_depth {
            builder.max_depth(Some(depth));
        }

        if self.config.threads > 0 {
            builder.threads(self.config.threads);
        }

        if let Some(overrides) = self.overrides(root) {
            builder.overrides(overrides);
        }

        builder.filter_entry(|entry| {
            !entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
                || !entry
                    .file_name()
                    .to_str()
                    .map(is_skipped_directory)
                    .unwrap_or(false)
        });

        builder
    }

    /// Exclude patterns as ignore-crate overrides rooted at `root`.
    fn overrides(&self, root: &Path) -> Option<Override> {
        if self.config.exclude_patterns.is_empty() {
            return None;
        }
        // In the ignore crate's override system a pattern without `!` is a
        // whitelist entry, so excludes carry the `!` prefix.
        let mut override_builder = OverrideBuilder::new(root);
        for pattern in &self.config.exclude_patterns {
            if let Err(e) = override_builder.add(&format!("!{}", pattern)) {
                tracing::warn!("ignoring invalid exclude pattern `{}`: {}", pattern, e);
            }
        }
        match override_builder.build() {
            Ok(overrides) => Some(overrides),
            Err(e) => {
                tracing::warn!("ignoring exclude patterns: {}", e);
                None
            }
        }
    }

    /// Walk the given root directory, returning a receiver of matching files.
    ///
    /// Files are streamed through the channel as they're discovered.
    /// Returns (receiver, handle) where the handle can be joined to get stats.
    pub fn walk(&self, root: &Path) -> (Receiver<WalkedFile>, WalkHandle) {
        let (tx, rx) = bounded(1000);
        let builder = self.builder(root);
        let counters = Arc::new(Counters::default());
        let root = root.to_path_buf();
        let include = self.include.clone();

        let handle = if self.should_use_parallel(&root) {
            let walker = builder.build_parallel();
            let counters_for_thread = Arc::clone(&counters);
            std::thread::spawn(move || {
                walker.run(|| {
                    let tx = tx.clone();
                    let counters = Arc::clone(&counters_for_thread);
                    let root = root.clone();
                    let include = include.clone();
                    Box::new(move |entry| {
                        match visit(entry, &root, &include, &counters, &tx) {
                            Visit::Continue => WalkState::Continue,
                            Visit::Quit => WalkState::Quit,
                        }
                    })
                });
                counters_for_thread.stats()
            })
        } else {
            let walker = builder.build();
            let counters_for_thread = Arc::clone(&counters);
            std::thread::spawn(move || {
                for entry in walker {
                    if let Visit::Quit = visit(entry, &root, &include, &counters_for_thread, &tx)
                    {
                        break;
                    }
                }
                counters_for_thread.stats()
            })
        };

        (rx, WalkHandle { handle })
    }

    /// Walk and collect all matching files, sorted by relative path.
    pub fn walk_collect(&self, root: &Path) -> (Vec<WalkedFile>, WalkStats) {
        let (rx, handle) = self.walk(root);
        let mut files: Vec<_> = rx.iter().collect();
        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        let stats = handle.join();
        (files, stats)
    }

    /// Whether a root-relative file path would be reported by a walk of
    /// `root`: it matches the include glob and no component of it is
    /// hidden, a skipped directory, or excluded.
    ///
    /// Gitignore rules are not consulted.
    pub fn matches(&self, root: &Path, relative: &Path) -> bool {
        if !self.include.is_match(relative) {
            return false;
        }

        let components: Vec<&OsStr> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name),
                _ => None,
            })
            .collect();
        let Some((_, dirs)) = components.split_last() else {
            return false;
        };
        if self.config.hidden
            && components
                .iter()
                .any(|name| name.to_string_lossy().starts_with('.'))
        {
            return false;
        }
        if dirs
            .iter()
            .any(|name| is_skipped_directory(&name.to_string_lossy()))
        {
            return false;
        }

        let Some(overrides) = self.overrides(root) else {
            return true;
        };
        let mut prefix = PathBuf::new();
        for (i, name) in components.iter().enumerate() {
            prefix.push(name);
            let is_dir = i + 1 < components.len();
            if overrides.matched(root.join(&prefix), is_dir).is_ignore() {
                return false;
            }
        }
        true
    }
}

fn is_skipped_directory(name: &str) -> bool {
    SKIP_DIRECTORIES.contains(&name)
}

fn visit(
    entry: std::result::Result<ignore::DirEntry, ignore::Error>,
    root: &Path,
    include: &GlobMatcher,
    counters: &Counters,
    tx: &Sender<WalkedFile>,
) -> Visit {
    match entry {
        Ok(entry) => {
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                return Visit::Continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.path().to_path_buf());

            if !include.is_match(&relative) {
                counters.unmatched.fetch_add(1, Ordering::Relaxed);
                return Visit::Continue;
            }

            counters.found.fetch_add(1, Ordering::Relaxed);
            let walked = WalkedFile {
                depth: entry.depth(),
                path: entry.into_path(),
                relative,
            };
            if tx.send(walked).is_err() {
                return Visit::Quit;
            }
            Visit::Continue
        }
        Err(err) => {
            if is_loop_error(&err) {
                tracing::warn!("Symlink loop detected: {}", err);
                counters.loops.fetch_add(1, Ordering::Relaxed);
            } else {
                tracing::warn!("Walk error: {}", err);
                counters.errors.fetch_add(1, Ordering::Relaxed);
            }
            Visit::Continue
        }
    }
}

/// Handle to a running walk operation.
pub struct WalkHandle {
    handle: std::thread::JoinHandle<WalkStats>,
}

impl WalkHandle {
    /// Wait for the walk to complete and return stats.
    pub fn join(self) -> WalkStats {
        self.handle.join().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "walker_tests.rs"]
mod tests;
