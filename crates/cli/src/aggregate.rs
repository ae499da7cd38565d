// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Derived status of composite nodes.
//!
//! Nothing is cached: every call reads the store as it is now, so a status
//! observed mid-run may differ between two calls.

use serde::Serialize;

use crate::node::{NodeId, TestTree};
use crate::status::{Status, StatusStore};

/// Combine child statuses with a node's own direct entry.
///
/// First match wins: running, pending, a direct failure, any failed child,
/// any passed child, any aborted child, any skipped child. Otherwise the
/// direct entry, or `unknown`.
pub fn combine(children: impl IntoIterator<Item = Status>, own: Option<Status>) -> Status {
    let mut seen = StatusCounts::default();
    for status in children {
        seen.add(status);
    }

    if seen.running > 0 {
        Status::Running
    } else if seen.pending > 0 {
        Status::Pending
    } else if own == Some(Status::Failed) || seen.failed > 0 {
        Status::Failed
    } else if seen.passed > 0 {
        Status::Passed
    } else if seen.aborted > 0 {
        Status::Aborted
    } else if seen.skipped > 0 {
        Status::Skipped
    } else {
        own.unwrap_or(Status::Unknown)
    }
}

/// Display status of `id`: its own entry for a leaf, the combined status
/// of its subtree otherwise.
pub fn derived_status(tree: &TestTree, id: NodeId, store: &StatusStore) -> Status {
    let node = &tree[id];
    let own = lookup(store, &node.dotted_path);
    if node.is_leaf() {
        return own.unwrap_or(Status::Unknown);
    }
    combine(
        node.children
            .iter()
            .map(|&child| derived_status(tree, child, store)),
        own,
    )
}

/// Derived status of every node in one bottom-up pass, indexed by
/// [`NodeId::index`].
pub fn derive_all(tree: &TestTree, store: &StatusStore) -> Vec<Status> {
    let mut statuses = vec![Status::Unknown; tree.len()];
    let mut order = tree.walk();
    order.reverse();
    for id in order {
        let node = &tree[id];
        let own = lookup(store, &node.dotted_path);
        statuses[id.index()] = if node.is_leaf() {
            own.unwrap_or(Status::Unknown)
        } else {
            combine(
                node.children.iter().map(|child| statuses[child.index()]),
                own,
            )
        };
    }
    statuses
}

/// Combined status of all roots, as seen by a pseudo-root above them.
pub fn forest_status(tree: &TestTree, store: &StatusStore) -> Status {
    combine(
        tree.roots()
            .iter()
            .map(|&root| derived_status(tree, root, store)),
        None,
    )
}

/// Whether nothing at or below `id` is still queued or running.
pub fn is_run_complete(tree: &TestTree, id: NodeId, store: &StatusStore) -> bool {
    !derived_status(tree, id, store).is_in_flight()
}

/// Pseudo-roots have an empty path and no entry of their own.
fn lookup(store: &StatusStore, path: &str) -> Option<Status> {
    if path.is_empty() {
        None
    } else {
        store.get_status(path)
    }
}

/// Number of paths in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub aborted: usize,
    pub pending: usize,
    pub running: usize,
    pub unknown: usize,
}

impl StatusCounts {
    /// Count the current status of every path (missing entries are unknown).
    pub fn of<'a>(store: &StatusStore, paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts = Self::default();
        for path in paths {
            counts.add(store.get_status(path).unwrap_or_default());
        }
        counts
    }

    pub fn add(&mut self, status: Status) {
        match status {
            Status::Passed => self.passed += 1,
            Status::Failed => self.failed += 1,
            Status::Skipped => self.skipped += 1,
            Status::Aborted => self.aborted += 1,
            Status::Pending => self.pending += 1,
            Status::Running => self.running += 1,
            Status::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.passed
            + self.failed
            + self.skipped
            + self.aborted
            + self.pending
            + self.running
            + self.unknown
    }
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;
