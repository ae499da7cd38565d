// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Observable per-test status store.
//!
//! One [`StatusStore`] is constructed per process and shared (behind an
//! `Arc`) with discovery, the streaming parser, the aggregator and any
//! presentation layer. Entries are keyed by dotted path and survive tree
//! rebuilds; only [`StatusStore::clear`] drops them.
//!
//! Every mutation is an independent upsert and broadcasts a
//! [`StatusChange`] to all live subscribers.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use dashmap::DashMap;
use serde::Serialize;

/// Execution state of a single dotted path.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Queued for the current run.
    Pending,
    /// Start observed, no terminal result yet.
    Running,
    Passed,
    Failed,
    Skipped,
    /// Cancelled while pending or running.
    Aborted,
    /// No evidence either way.
    #[default]
    Unknown,
}

impl Status {
    /// Terminal statuses do not change again within a run.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Passed | Status::Failed | Status::Skipped | Status::Aborted
        )
    }

    /// Pending or running.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Status::Pending | Status::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Running => "running",
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Skipped => "skipped",
            Status::Aborted => "aborted",
            Status::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected/actual text pair extracted from a failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub expected: String,
    pub actual: String,
}

/// Stored state for one dotted path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
}

/// Which part of an entry a mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Status,
    Duration,
    FailureDetail,
    Diff,
    Reset,
    Cleared,
}

/// Notification broadcast after every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Empty for [`ChangeKind::Cleared`].
    pub path: String,
    pub kind: ChangeKind,
    /// Store generation after the mutation.
    pub generation: u64,
}

/// Concurrent dotted-path keyed status store.
#[derive(Debug, Default)]
pub struct StatusStore {
    entries: DashMap<String, StatusEntry>,
    subscribers: Mutex<Vec<Sender<StatusChange>>>,
    generation: AtomicU64,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to change notifications. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<StatusChange> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        rx
    }

    /// Monotonic counter bumped by every mutation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn notify(&self, path: &str, kind: ChangeKind) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let change = StatusChange {
            path: path.to_string(),
            kind,
            generation,
        };
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }

    fn upsert(&self, path: &str, kind: ChangeKind, apply: impl FnOnce(&mut StatusEntry)) {
        // The shard guard must be released before subscribers run.
        {
            let mut entry = self.entries.entry(path.to_string()).or_default();
            apply(entry.value_mut());
        }
        self.notify(path, kind);
    }

    pub fn set_status(&self, path: &str, status: Status) {
        self.upsert(path, ChangeKind::Status, |e| e.status = status);
    }

    pub fn set_duration(&self, path: &str, duration: Duration) {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.upsert(path, ChangeKind::Duration, |e| e.duration_ms = Some(ms));
    }

    pub fn set_failure_detail(&self, path: &str, detail: impl Into<String>) {
        let detail = detail.into();
        self.upsert(path, ChangeKind::FailureDetail, |e| {
            e.failure_detail = Some(detail)
        });
    }

    pub fn set_diff(&self, path: &str, expected: impl Into<String>, actual: impl Into<String>) {
        let diff = Diff {
            expected: expected.into(),
            actual: actual.into(),
        };
        self.upsert(path, ChangeKind::Diff, |e| e.diff = Some(diff));
    }

    /// Replace the whole entry with a fresh one in `status`.
    pub fn reset(&self, path: &str, status: Status) {
        self.upsert(path, ChangeKind::Reset, |e| {
            *e = StatusEntry {
                status,
                ..StatusEntry::default()
            }
        });
    }

    /// Insert an `unknown` entry unless one already exists.
    ///
    /// Returns true when a new entry was created.
    pub fn register(&self, path: &str) -> bool {
        let created = match self.entries.entry(path.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(StatusEntry::default());
                true
            }
        };
        if created {
            self.notify(path, ChangeKind::Status);
        }
        created
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
        self.notify("", ChangeKind::Cleared);
    }

    pub fn get_status(&self, path: &str) -> Option<Status> {
        self.entries.get(path).map(|e| e.status)
    }

    pub fn get_duration(&self, path: &str) -> Option<Duration> {
        self.entries
            .get(path)
            .and_then(|e| e.duration_ms)
            .map(Duration::from_millis)
    }

    pub fn get_failure_detail(&self, path: &str) -> Option<String> {
        self.entries
            .get(path)
            .and_then(|e| e.failure_detail.clone())
    }

    pub fn get_diff(&self, path: &str) -> Option<Diff> {
        self.entries.get(path).and_then(|e| e.diff.clone())
    }

    /// Snapshot of a full entry.
    pub fn entry(&self, path: &str) -> Option<StatusEntry> {
        self.entries.get(path).map(|e| e.value().clone())
    }

    /// Every known dotted path, sorted.
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Dotted paths currently `failed`, sorted.
    pub fn failed_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.status == Status::Failed)
            .map(|e| e.key().clone())
            .collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
