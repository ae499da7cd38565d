// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pure transition function over classified output lines.
//!
//! The machine has three states. `Idle` between tests, `InTest` while a
//! test identifier has been seen without its terminal token, and
//! `InFailureBlock` while a consolidated failure report is being captured.
//! [`step`] never touches the status store; it returns the events a line
//! produces and the next state.

use std::time::Duration;

use super::grammar::{LineKind, Outcome, RunSummary, classify};

/// Scanner position between two lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScanState {
    #[default]
    Idle,
    InTest {
        path: String,
    },
    InFailureBlock {
        path: String,
        lines: Vec<String>,
    },
}

/// Lifecycle transition produced by one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started {
        path: String,
    },
    Finished {
        path: String,
        outcome: Outcome,
        duration: Option<Duration>,
    },
    /// A consolidated report names `path` as failed.
    FailureReported {
        path: String,
    },
    /// Captured report body for `path`.
    FailureDetail {
        path: String,
        detail: String,
        diff: Option<(String, String)>,
    },
    Summary(RunSummary),
}

/// Advance the machine by one line (escape sequences already stripped).
pub fn step(state: ScanState, line: &str) -> (ScanState, Vec<Event>) {
    let kind = classify(line);

    if let ScanState::InFailureBlock { path, mut lines } = state {
        return match kind {
            // A separator straight after the header opens the body.
            LineKind::Separator if lines.is_empty() => {
                (ScanState::InFailureBlock { path, lines }, Vec::new())
            }
            LineKind::Separator | LineKind::ReportBoundary => {
                (ScanState::Idle, vec![close_block(path, &lines)])
            }
            LineKind::FailureHeader { path: next } => (
                ScanState::InFailureBlock {
                    path: next.clone(),
                    lines: Vec::new(),
                },
                vec![
                    close_block(path, &lines),
                    Event::FailureReported { path: next },
                ],
            ),
            LineKind::Summary(summary) => (
                ScanState::Idle,
                vec![close_block(path, &lines), Event::Summary(summary)],
            ),
            _ => {
                lines.push(line.trim_end().to_string());
                (ScanState::InFailureBlock { path, lines }, Vec::new())
            }
        };
    }

    match kind {
        LineKind::TestStart {
            path,
            result: Some(result),
        } => (
            ScanState::Idle,
            vec![
                Event::Started { path: path.clone() },
                Event::Finished {
                    path,
                    outcome: result.outcome,
                    duration: result.duration,
                },
            ],
        ),
        LineKind::TestStart { path, result: None } => (
            ScanState::InTest { path: path.clone() },
            vec![Event::Started { path }],
        ),
        LineKind::Result(result) => match state {
            ScanState::InTest { path } => (
                ScanState::Idle,
                vec![Event::Finished {
                    path,
                    outcome: result.outcome,
                    duration: result.duration,
                }],
            ),
            other => (other, Vec::new()),
        },
        LineKind::FailureHeader { path } => (
            ScanState::InFailureBlock {
                path: path.clone(),
                lines: Vec::new(),
            },
            vec![Event::FailureReported { path }],
        ),
        LineKind::Summary(summary) => (state, vec![Event::Summary(summary)]),
        LineKind::Separator | LineKind::ReportBoundary | LineKind::Other => (state, Vec::new()),
    }
}

/// Events owed when the stream ends in `state`.
pub fn finish(state: ScanState) -> Vec<Event> {
    match state {
        ScanState::InFailureBlock { path, lines } if !lines.is_empty() => {
            vec![close_block(path, &lines)]
        }
        _ => Vec::new(),
    }
}

fn close_block(path: String, lines: &[String]) -> Event {
    let body = trim_blank_edges(lines);
    Event::FailureDetail {
        path,
        detail: body.join("\n"),
        diff: extract_diff(body),
    }
}

fn trim_blank_edges(lines: &[String]) -> &[String] {
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(start, |i| i + 1);
    &lines[start..end]
}

/// Expected/actual text from `- ` (removed) and `+ ` (added) lines.
///
/// Unified-diff file headers (`---`, `+++`) are not content.
pub fn extract_diff(lines: &[String]) -> Option<(String, String)> {
    let mut expected = Vec::new();
    let mut actual = Vec::new();

    for line in lines {
        if line.starts_with("---") || line.starts_with("+++") {
            continue;
        }
        if let Some(rest) = marker_content(line, '-') {
            expected.push(rest);
        } else if let Some(rest) = marker_content(line, '+') {
            actual.push(rest);
        }
    }

    if expected.is_empty() && actual.is_empty() {
        return None;
    }
    Some((expected.join("\n"), actual.join("\n")))
}

fn marker_content(line: &str, marker: char) -> Option<&str> {
    let rest = line.strip_prefix(marker)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix(' ')
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
