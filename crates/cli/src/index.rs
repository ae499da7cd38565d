// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery index and tree assembly.
//!
//! [`TestIndex`] retains one [`ParsedFile`] per test file. The forest is
//! always rebuilt from the index contents by [`assemble`], so a full
//! discovery pass and a sequence of incremental per-file updates over the
//! same files produce the same tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::DiscoveryConfig;
use crate::error::Result;
use crate::node::{NodeId, NodeKind, SourceLocation, TestTree};
use crate::scan::{ParsedFile, Scanner};
use crate::status::StatusStore;
use crate::walker::{FileWalker, WalkerConfig};

/// A file that could not be scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Result of a full discovery pass.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub tree: TestTree,
    /// Files matching the include glob.
    pub files_scanned: usize,
    /// Files that contributed at least one test.
    pub files_with_tests: usize,
    /// Unreadable files, skipped.
    pub errors: Vec<ScanFailure>,
}

impl DiscoveryReport {
    /// No test was found. Informational, not an error.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

/// Retained `relative path → parsed file` index for one root.
pub struct TestIndex {
    root: PathBuf,
    scanner: Scanner,
    walker: FileWalker,
    files: BTreeMap<PathBuf, ParsedFile>,
}

impl TestIndex {
    pub fn new(root: &Path, config: &DiscoveryConfig) -> Result<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            scanner: Scanner::new(config),
            walker: FileWalker::new(WalkerConfig::from_discovery(config))?,
            files: BTreeMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parsed files in path order.
    pub fn files(&self) -> impl Iterator<Item = &ParsedFile> {
        self.files.values()
    }

    /// Walk the root, scan every matching file in parallel, and rebuild the
    /// index from scratch.
    pub fn discover(&mut self, store: &StatusStore) -> DiscoveryReport {
        let (walked, stats) = self.walker.walk_collect(&self.root);
        tracing::debug!(
            "walked {}: {} candidate files, {} errors",
            self.root.display(),
            stats.files_found,
            stats.errors
        );

        let scanner = &self.scanner;
        let root = &self.root;
        let results: Vec<_> = walked
            .par_iter()
            .map(|file| (file.relative.clone(), scanner.scan_path(root, &file.relative)))
            .collect();

        self.files.clear();
        let mut errors = Vec::new();
        for (rel, result) in results {
            match result {
                Ok(Some(parsed)) => {
                    tracing::debug!("{}: {} tests", rel.display(), parsed.method_count());
                    self.files.insert(rel, parsed);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("skipping {}: {}", rel.display(), e);
                    errors.push(ScanFailure {
                        path: rel,
                        message: e.to_string(),
                    });
                }
            }
        }

        let tree = self.assemble();
        register(&tree, store);

        DiscoveryReport {
            tree,
            files_scanned: walked.len(),
            files_with_tests: self.files.len(),
            errors,
        }
    }

    /// Re-scan one file and rebuild the forest.
    ///
    /// A file the walk would not report (include glob, hidden or skipped
    /// directories, exclude patterns), one without tests, or one that
    /// cannot be read is dropped from the index.
    pub fn update_file(&mut self, path: &Path, store: &StatusStore) -> TestTree {
        let rel = self.relative(path);
        if !self.walker.matches(&self.root, &rel) {
            tracing::debug!("{}: outside discovery pattern", rel.display());
            self.files.remove(&rel);
        } else {
            match self.scanner.scan_path(&self.root, &rel) {
                Ok(Some(parsed)) => {
                    self.files.insert(rel, parsed);
                }
                Ok(None) => {
                    self.files.remove(&rel);
                }
                Err(e) => {
                    tracing::warn!("skipping {}: {}", rel.display(), e);
                    self.files.remove(&rel);
                }
            }
        }

        let tree = self.assemble();
        register(&tree, store);
        tree
    }

    /// Forget a deleted file and rebuild the forest.
    pub fn remove_file(&mut self, path: &Path, store: &StatusStore) -> TestTree {
        let rel = self.relative(path);
        self.files.remove(&rel);
        let tree = self.assemble();
        register(&tree, store);
        tree
    }

    /// Build the forest from the current index contents.
    pub fn assemble(&self) -> TestTree {
        assemble(self.files.values())
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Group parsed files by directory into a sorted forest.
///
/// Directory nodes are reused by name among their siblings. The first
/// directory below the root is an `app`, deeper ones are `folder`s. A file
/// whose module name collides with a sibling directory is shadowed by the
/// directory and left out, as is a file below a directory (or with a module
/// name) containing a `.`, which no dotted path can address.
pub fn assemble<'a>(files: impl IntoIterator<Item = &'a ParsedFile>) -> TestTree {
    let mut tree = TestTree::new();
    let mut placed: Vec<(&ParsedFile, Option<NodeId>)> = Vec::new();

    for file in files {
        let segments = file.dir_segments();
        if file.module.contains('.') || segments.iter().any(|s| s.contains('.')) {
            tracing::warn!(
                "{}: path segment contains `.`, skipped",
                file.path.display()
            );
            continue;
        }
        let mut parent: Option<NodeId> = None;
        for segment in segments {
            parent = Some(match tree.find_child(parent, &segment) {
                Some(id) if tree[id].kind.is_grouping() => id,
                _ => {
                    let kind = if parent.is_none() {
                        NodeKind::App
                    } else {
                        NodeKind::Folder
                    };
                    match parent {
                        Some(p) => tree.insert_child(p, segment, kind, None),
                        None => tree.insert_root(segment, kind, None),
                    }
                }
            });
        }
        placed.push((file, parent));
    }

    for (file, parent) in placed {
        if tree.find_child(parent, &file.module).is_some() {
            tracing::warn!(
                "{}: module name collides with a sibling, skipped",
                file.path.display()
            );
            continue;
        }
        attach_file(&mut tree, parent, file);
    }

    tree.sort();
    tree
}

fn attach_file(tree: &mut TestTree, parent: Option<NodeId>, file: &ParsedFile) {
    let location = |start_line, end_line| {
        Some(SourceLocation {
            file: file.path.clone(),
            start_line,
            end_line,
        })
    };

    let file_location = location(1, file.line_count.max(1));
    let file_id = match parent {
        Some(p) => tree.insert_child(p, file.module.clone(), NodeKind::File, file_location),
        None => tree.insert_root(file.module.clone(), NodeKind::File, file_location),
    };

    for class in &file.classes {
        let class_id = match tree.find_child(Some(file_id), &class.name) {
            Some(existing) if tree[existing].kind == NodeKind::Class => existing,
            Some(_) => continue,
            None => tree.insert_child(
                file_id,
                class.name.clone(),
                NodeKind::Class,
                location(class.start_line, class.end_line),
            ),
        };
        for method in &class.methods {
            if tree.find_child(Some(class_id), &method.name).is_none() {
                tree.insert_child(
                    class_id,
                    method.name.clone(),
                    NodeKind::Method,
                    location(method.start_line, method.end_line),
                );
            }
        }
    }

    for function in &file.functions {
        if tree.find_child(Some(file_id), &function.name).is_none() {
            tree.insert_child(
                file_id,
                function.name.clone(),
                NodeKind::Method,
                location(function.start_line, function.end_line),
            );
        }
    }
}

/// Give every node of `tree` a store entry, keeping existing ones.
pub fn register(tree: &TestTree, store: &StatusStore) {
    let added = tree
        .iter()
        .filter(|(_, node)| !node.dotted_path.is_empty())
        .filter(|(_, node)| store.register(&node.dotted_path))
        .count();
    if added > 0 {
        tracing::debug!("registered {} new paths", added);
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
