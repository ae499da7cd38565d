// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON output formatter.
//!
//! JSON is buffered and written at the end (not streamed).

use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

use crate::aggregate::derive_all;
use crate::index::DiscoveryReport;
use crate::node::{NodeId, NodeKind, SourceLocation, TestTree};
use crate::session::RunReport;
use crate::status::{Diff, Status, StatusStore};

/// One node with its derived status and, for stored paths, its entry.
#[derive(Debug, Serialize)]
pub struct NodeOutput {
    pub name: String,
    pub kind: NodeKind,
    pub path: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeOutput>,
}

/// Unreadable file reported by discovery.
#[derive(Debug, Serialize)]
pub struct ScanErrorOutput {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct DiscoverOutput {
    timestamp: String,
    files_scanned: usize,
    files_with_tests: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<ScanErrorOutput>,
    tests: Vec<NodeOutput>,
}

#[derive(Debug, Serialize)]
struct RunOutput<'a> {
    timestamp: String,
    status: Status,
    run: &'a RunReport,
    tests: Vec<NodeOutput>,
}

/// Build the serializable forest, children in display order.
pub fn tree_output(tree: &TestTree, store: &StatusStore) -> Vec<NodeOutput> {
    let statuses = derive_all(tree, store);
    tree.roots()
        .iter()
        .map(|&root| node_output(tree, root, &statuses, store))
        .collect()
}

fn node_output(
    tree: &TestTree,
    id: NodeId,
    statuses: &[Status],
    store: &StatusStore,
) -> NodeOutput {
    let node = &tree[id];
    let entry = if node.dotted_path.is_empty() {
        None
    } else {
        store.entry(&node.dotted_path)
    };
    let (duration_ms, failure_detail, diff) = match entry {
        Some(entry) => (entry.duration_ms, entry.failure_detail, entry.diff),
        None => (None, None, None),
    };
    NodeOutput {
        name: node.name.clone(),
        kind: node.kind,
        path: node.dotted_path.clone(),
        status: statuses[id.index()],
        location: node.location.clone(),
        duration_ms,
        failure_detail,
        diff,
        children: node
            .children
            .iter()
            .map(|&child| node_output(tree, child, statuses, store))
            .collect(),
    }
}

/// JSON output formatter.
pub struct JsonFormatter<W: Write> {
    writer: W,
}

impl<W: Write> JsonFormatter<W> {
    /// Create a new JSON formatter.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write discovery results.
    pub fn write_discovery(
        &mut self,
        report: &DiscoveryReport,
        store: &StatusStore,
    ) -> std::io::Result<()> {
        let output = DiscoverOutput {
            timestamp: timestamp(),
            files_scanned: report.files_scanned,
            files_with_tests: report.files_with_tests,
            errors: report
                .errors
                .iter()
                .map(|e| ScanErrorOutput {
                    path: e.path.clone(),
                    message: e.message.clone(),
                })
                .collect(),
            tests: tree_output(&report.tree, store),
        };
        self.emit(&output)
    }

    /// Write a finished run: overall status, report and the run's tree.
    pub fn write_run(
        &mut self,
        report: &RunReport,
        status: Status,
        tree: &TestTree,
        store: &StatusStore,
    ) -> std::io::Result<()> {
        let output = RunOutput {
            timestamp: timestamp(),
            status,
            run: report,
            tests: tree_output(tree, store),
        };
        self.emit(&output)
    }

    fn emit(&mut self, value: &impl Serialize) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{}", json)
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
