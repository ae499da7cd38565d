// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming result parser.
//!
//! Consumes runner output in arbitrary chunks and turns complete lines into
//! status store transitions. Partial lines stay buffered until their newline
//! arrives, so the transitions applied never depend on where chunks were
//! split.

pub mod grammar;
pub mod machine;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

pub use grammar::{LineKind, Outcome, RunSummary, TestResult, classify, strip_ansi};
pub use machine::{Event, ScanState, step};

use crate::process::ExitOutcome;
use crate::status::{Status, StatusStore};
use crate::target::RunScope;

/// Incremental parser bound to one run scope.
pub struct StreamParser {
    store: Arc<StatusStore>,
    scope: RunScope,
    buffer: Vec<u8>,
    state: ScanState,
    start_times: HashMap<String, Instant>,
    /// Paths that produced a per-test line of their own.
    reported: HashSet<String>,
    summary: Option<RunSummary>,
    lines: usize,
}

impl StreamParser {
    pub fn new(store: Arc<StatusStore>, scope: RunScope) -> Self {
        Self {
            store,
            scope,
            buffer: Vec::new(),
            state: ScanState::Idle,
            start_times: HashMap::new(),
            reported: HashSet::new(),
            summary: None,
            lines: 0,
        }
    }

    pub fn scope(&self) -> &RunScope {
        &self.scope
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    /// Mark the scope as queued: leaves become `pending` with their previous
    /// results cleared, composites fall back to `unknown`.
    pub fn begin(&self) {
        for leaf in &self.scope.leaves {
            self.store.reset(leaf, Status::Pending);
        }
        for composite in &self.scope.composites {
            self.store.reset(composite, Status::Unknown);
        }
    }

    /// Buffer a chunk of raw output.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Process every complete buffered line.
    pub fn process(&mut self) -> usize {
        self.process_at(Instant::now())
    }

    /// [`process`](Self::process) with an explicit clock reading.
    pub fn process_at(&mut self, now: Instant) -> usize {
        let Some(end) = memchr::memrchr(b'\n', &self.buffer) else {
            return 0;
        };
        let complete: Vec<u8> = self.buffer.drain(..=end).collect();
        let text = String::from_utf8_lossy(&complete);

        let mut count = 0;
        for line in text.lines() {
            self.feed_line(line, now);
            count += 1;
        }
        self.apply_summary_fallback();
        count
    }

    /// Process everything left, including a trailing line without newline,
    /// and close an open failure block.
    pub fn flush_at(&mut self, now: Instant) {
        self.process_at(now);
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let text = String::from_utf8_lossy(&rest);
            self.feed_line(&text, now);
        }
        for event in machine::finish(std::mem::take(&mut self.state)) {
            self.apply(event, now);
        }
        self.apply_summary_fallback();
    }

    /// Settle every scope node that never reached a terminal status.
    ///
    /// Running nodes were cut off by the exit and take its verdict. Pending
    /// nodes pass on success; on failure they are `skipped` under fail-fast
    /// and `unknown` otherwise. Returns the number of nodes changed.
    pub fn finalize(&mut self, exit: ExitOutcome, fail_fast: bool) -> usize {
        let success = exit.is_success();
        let mut changed = 0;
        for path in self.scope.paths() {
            let next = match self.store.get_status(path) {
                Some(Status::Running) if success => Status::Passed,
                Some(Status::Running) => Status::Failed,
                Some(Status::Pending) if success => Status::Passed,
                Some(Status::Pending) if fail_fast => Status::Skipped,
                Some(Status::Pending) => Status::Unknown,
                _ => continue,
            };
            tracing::debug!("finalize {} -> {}", path, next);
            self.store.set_status(path, next);
            changed += 1;
        }
        changed
    }

    /// Force every in-flight scope node to `aborted` and drop parser state.
    pub fn abort_in_flight(&mut self) -> usize {
        self.buffer.clear();
        self.state = ScanState::Idle;
        self.start_times.clear();

        let mut aborted = 0;
        for path in self.scope.paths() {
            if self
                .store
                .get_status(path)
                .is_some_and(Status::is_in_flight)
            {
                self.store.set_status(path, Status::Aborted);
                aborted += 1;
            }
        }
        aborted
    }

    /// Test presumed running right now.
    pub fn open_test(&self) -> Option<&str> {
        match &self.state {
            ScanState::InTest { path } => Some(path),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<RunSummary> {
        self.summary
    }

    /// Lines consumed so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    fn feed_line(&mut self, line: &str, now: Instant) {
        let clean = strip_ansi(line);
        let (next, events) = step(std::mem::take(&mut self.state), &clean);
        self.state = next;
        self.lines += 1;
        for event in events {
            self.apply(event, now);
        }
    }

    fn apply(&mut self, event: Event, now: Instant) {
        tracing::trace!("{:?}", event);
        match event {
            Event::Started { path } => {
                self.store.set_status(&path, Status::Running);
                self.start_times.insert(path.clone(), now);
                self.reported.insert(path);
            }
            Event::Finished {
                path,
                outcome,
                duration,
            } => {
                let started = self.start_times.remove(&path);
                let duration =
                    duration.or_else(|| started.map(|start| now.saturating_duration_since(start)));
                self.store.set_status(&path, outcome.status());
                if let Some(duration) = duration {
                    self.store.set_duration(&path, duration);
                }
                if let Some(detail) = outcome.detail() {
                    self.store.set_failure_detail(&path, detail);
                }
                self.reported.insert(path);
            }
            Event::FailureReported { path } => {
                if self.store.get_status(&path) != Some(Status::Failed) {
                    self.store.set_status(&path, Status::Failed);
                }
                self.reported.insert(path);
            }
            Event::FailureDetail { path, detail, diff } => {
                self.store.set_failure_detail(&path, detail);
                if let Some((expected, actual)) = diff {
                    self.store.set_diff(&path, expected, actual);
                }
            }
            Event::Summary(summary) => self.summary = Some(summary),
        }
    }

    /// A leaf target that printed no line of its own takes the overall
    /// verdict (e.g. a collection error before any test ran).
    fn apply_summary_fallback(&self) {
        let (Some(summary), Some(leaf)) = (self.summary, self.scope.leaf_target()) else {
            return;
        };
        if self.reported.contains(leaf) {
            return;
        }
        let status = match summary {
            RunSummary::Passed => Status::Passed,
            RunSummary::Failed => Status::Failed,
        };
        if self.store.get_status(leaf) != Some(status) {
            self.store.set_status(leaf, status);
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
