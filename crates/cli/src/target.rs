// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run target resolution.
//!
//! A [`RunTarget`] names what the user asked to run. Resolving it against
//! the current tree (and, for failed tests, the status store) yields the
//! [`RunScope`]: the labels handed to the runner and the dotted paths the
//! session observes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::RunnerConfig;
use crate::error::{Error, Result};
use crate::node::{NodeId, TestTree};
use crate::status::StatusStore;

/// Label of the pseudo-root built from the failed set.
pub const FAILED_LABEL: &str = "failed tests";

/// Label of the pseudo-root standing for the whole suite.
pub const SUITE_LABEL: &str = "all tests";

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTarget {
    /// Everything the runner discovers on its own.
    Suite,
    /// One discovered node, by dotted path.
    Node(String),
    /// Every path currently `failed` in the store.
    Failed,
}

/// Resolved run selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunScope {
    /// Display label of the run root.
    pub label: String,
    /// Positional labels appended to the runner invocation.
    pub labels: Vec<String>,
    /// Dotted path of the selected node; `None` for pseudo-roots.
    pub root_path: Option<String>,
    /// Whether the selected node is itself a leaf.
    pub root_is_leaf: bool,
    /// Leaves observed by the session, in display order.
    pub leaves: Vec<String>,
    /// Composite nodes observed by the session.
    pub composites: Vec<String>,
}

impl RunScope {
    pub fn resolve(target: &RunTarget, tree: &TestTree, store: &StatusStore) -> Result<Self> {
        match target {
            RunTarget::Suite => {
                if tree.is_empty() {
                    return Err(Error::NoTests);
                }
                let mut scope = RunScope {
                    label: SUITE_LABEL.to_string(),
                    ..RunScope::default()
                };
                for &root in tree.roots() {
                    scope.observe(tree, root);
                }
                Ok(scope)
            }
            RunTarget::Node(path) => {
                let id = tree
                    .find(path)
                    .ok_or_else(|| Error::Argument(format!("no test named `{}`", path)))?;
                let mut scope = RunScope {
                    label: tree[id].name.clone(),
                    labels: vec![path.clone()],
                    root_path: Some(path.clone()),
                    root_is_leaf: tree[id].is_leaf(),
                    ..RunScope::default()
                };
                scope.observe(tree, id);
                Ok(scope)
            }
            RunTarget::Failed => {
                let failed = outermost(store.failed_paths());
                if failed.is_empty() {
                    return Err(Error::NoTests);
                }
                let mut scope = RunScope {
                    label: FAILED_LABEL.to_string(),
                    labels: failed.clone(),
                    ..RunScope::default()
                };
                for path in failed {
                    match tree.find(&path) {
                        Some(id) => scope.observe(tree, id),
                        None => scope.leaves.push(path),
                    }
                }
                Ok(scope)
            }
        }
    }

    fn observe(&mut self, tree: &TestTree, id: NodeId) {
        for node in tree.descendants(id) {
            let path = tree[node].dotted_path.clone();
            if tree[node].is_leaf() {
                self.leaves.push(path);
            } else {
                self.composites.push(path);
            }
        }
    }

    /// The selected node when it is a leaf, for the summary fallback.
    pub fn leaf_target(&self) -> Option<&str> {
        if self.root_is_leaf {
            self.root_path.as_deref()
        } else {
            None
        }
    }

    /// Every observed path: leaves first, then composites.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.leaves
            .iter()
            .chain(self.composites.iter())
            .map(String::as_str)
    }

    /// The pseudo-root tree shown for a failed-tests run. Labels found in
    /// `tree` keep their subtrees.
    pub fn synthetic_tree(&self, tree: &TestTree) -> TestTree {
        TestTree::synthetic(&self.label, tree, self.labels.iter().cloned())
    }
}

/// Drop paths whose ancestor is also in the set.
fn outermost(mut paths: Vec<String>) -> Vec<String> {
    paths.sort();
    let mut kept: Vec<String> = Vec::new();
    for path in paths {
        let covered = kept
            .iter()
            .any(|k| path.starts_with(k.as_str()) && path[k.len()..].starts_with('.'));
        if !covered {
            kept.push(path);
        }
    }
    kept
}

/// Fully resolved runner command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    /// Configured arguments, then the fail-fast flag, then the scope labels.
    pub fn new(config: &RunnerConfig, root: &Path, scope: &RunScope, fail_fast: bool) -> Self {
        let mut args = config.args.clone();
        if fail_fast && !config.fail_fast_arg.is_empty() {
            args.push(config.fail_fast_arg.clone());
        }
        args.extend(scope.labels.iter().cloned());
        Self {
            command: config.command.clone(),
            args,
            cwd: config.working_dir(root),
            env: config.env.clone(),
        }
    }

    /// Shell-like rendering for logs and messages.
    pub fn display(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
