// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Line grammar of unittest-style verbose runner output.
//!
//! ```text
//! test_total (billing.tests.test_invoice.InvoiceTests) ... ok
//! test_tax (billing.tests.test_invoice.InvoiceTests.test_tax) ... FAIL (0.002s)
//! ======================================================================
//! FAIL: test_tax (billing.tests.test_invoice.InvoiceTests)
//! ----------------------------------------------------------------------
//! ...detail...
//! ----------------------------------------------------------------------
//! FAILED (failures=1)
//! ```

use std::borrow::Cow;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::status::Status;

/// CSI (`ESC [ ... final`) and OSC (`ESC ] ... BEL|ST`) sequences.
#[allow(clippy::expect_used)]
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
        .expect("valid regex")
});

/// `<method> (<qualified.path>)` followed by the rest of the line.
#[allow(clippy::expect_used)]
static TEST_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_]\w*) \(([A-Za-z_][\w.]*)\)(.*)$").expect("valid regex")
});

/// Terminal token with an optional reported duration.
#[allow(clippy::expect_used)]
static RESULT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(ok|FAIL|ERROR|skipped(?: (.*?))?|expected failure|unexpected success)(?: \((\d+(?:\.\d+)?)s\))?\s*$",
    )
    .expect("valid regex")
});

/// `FAIL: <method> (<path>)` / `ERROR: <method> (<path>)`.
#[allow(clippy::expect_used)]
static FAILURE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(FAIL|ERROR): ([A-Za-z_]\w*) \(([A-Za-z_][\w.]*)\)").expect("valid regex")
});

#[allow(clippy::expect_used)]
static SUMMARY_OK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^OK(?: \(.*\))?\s*$").expect("valid regex"));

#[allow(clippy::expect_used)]
static SUMMARY_FAILED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^FAILED \(.*\)\s*$").expect("valid regex"));

/// Minimum run of `-` or `=` that counts as a separator.
const SEPARATOR_MIN: usize = 20;

/// Class- and module-level fixtures; failures in them belong to the
/// enclosing class or module rather than to a method.
const FIXTURE_HOOKS: &[&str] = &["setUpClass", "tearDownClass", "setUpModule", "tearDownModule"];

/// Terminal token of a single test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Fail,
    Error,
    /// Skipped, with the runner's reason text when given.
    Skipped(Option<String>),
    ExpectedFailure,
    UnexpectedSuccess,
}

impl Outcome {
    pub fn status(&self) -> Status {
        match self {
            Outcome::Ok | Outcome::ExpectedFailure => Status::Passed,
            Outcome::Fail | Outcome::Error | Outcome::UnexpectedSuccess => Status::Failed,
            Outcome::Skipped(_) => Status::Skipped,
        }
    }

    /// Short text stored as failure detail until a report block replaces it.
    pub fn detail(&self) -> Option<String> {
        match self {
            Outcome::Ok | Outcome::ExpectedFailure => None,
            Outcome::Fail => Some("FAIL".to_string()),
            Outcome::Error => Some("ERROR".to_string()),
            Outcome::UnexpectedSuccess => Some("unexpected success".to_string()),
            Outcome::Skipped(reason) => reason.clone(),
        }
    }
}

/// A terminal token plus the duration the runner reported, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub outcome: Outcome,
    pub duration: Option<Duration>,
}

/// Overall verdict printed at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSummary {
    Passed,
    Failed,
}

/// What a single output line means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// A test identifier line, possibly carrying its result inline.
    TestStart {
        path: String,
        result: Option<TestResult>,
    },
    /// A terminal token on its own, or after a docstring line.
    Result(TestResult),
    /// Consolidated report header for one failing test.
    FailureHeader { path: String },
    /// A line of `-`.
    Separator,
    /// A line of `=`, which precedes every report header.
    ReportBoundary,
    Summary(RunSummary),
    Other,
}

/// Remove terminal escape sequences and carriage returns.
pub fn strip_ansi(line: &str) -> Cow<'_, str> {
    if !line.contains(['\x1b', '\r']) {
        return Cow::Borrowed(line);
    }
    let stripped = ANSI_ESCAPE.replace_all(line, "");
    Cow::Owned(stripped.replace('\r', ""))
}

/// Dotted path for `<method> (<qualified>)`.
///
/// Older runners print the class path, newer ones include the method;
/// either way the result ends in `.<method>` exactly once. Fixture hooks
/// resolve to the enclosing class or module.
pub fn normalize_path(method: &str, qualified: &str) -> String {
    let suffix = format!(".{method}");
    let base = qualified.strip_suffix(&suffix).unwrap_or(qualified);
    if FIXTURE_HOOKS.contains(&method) {
        base.to_string()
    } else {
        format!("{base}.{method}")
    }
}

/// Classify one line with escape sequences already stripped.
pub fn classify(line: &str) -> LineKind {
    let line = line.trim_end();

    if let Some(caps) = FAILURE_HEADER.captures(line) {
        let method = caps.get(2).map_or("", |m| m.as_str());
        let qualified = caps.get(3).map_or("", |m| m.as_str());
        return LineKind::FailureHeader {
            path: normalize_path(method, qualified),
        };
    }

    if let Some(fill) = separator_fill(line) {
        return match fill {
            '-' => LineKind::Separator,
            _ => LineKind::ReportBoundary,
        };
    }

    if SUMMARY_OK.is_match(line) {
        return LineKind::Summary(RunSummary::Passed);
    }
    if SUMMARY_FAILED.is_match(line) {
        return LineKind::Summary(RunSummary::Failed);
    }

    if let Some(caps) = TEST_START.captures(line) {
        let method = caps.get(1).map_or("", |m| m.as_str());
        let qualified = caps.get(2).map_or("", |m| m.as_str());
        let rest = caps.get(3).map_or("", |m| m.as_str());
        return LineKind::TestStart {
            path: normalize_path(method, qualified),
            result: trailing_result(rest),
        };
    }

    match trailing_result(line).or_else(|| parse_result(line.trim_start())) {
        Some(result) => LineKind::Result(result),
        None => LineKind::Other,
    }
}

/// The token after the last ` ... ` marker, if it is a terminal token.
fn trailing_result(text: &str) -> Option<TestResult> {
    let (_, after) = text.rsplit_once(" ... ")?;
    parse_result(after)
}

fn parse_result(token: &str) -> Option<TestResult> {
    let caps = RESULT_TOKEN.captures(token)?;
    let word = caps.get(1).map_or("", |m| m.as_str());
    let outcome = match word {
        "ok" => Outcome::Ok,
        "FAIL" => Outcome::Fail,
        "ERROR" => Outcome::Error,
        "expected failure" => Outcome::ExpectedFailure,
        "unexpected success" => Outcome::UnexpectedSuccess,
        _ => Outcome::Skipped(
            caps.get(2)
                .map(|m| m.as_str().trim().to_string())
                .filter(|reason| !reason.is_empty()),
        ),
    };
    let duration = caps
        .get(3)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(Duration::from_secs_f64);
    Some(TestResult { outcome, duration })
}

/// `Some('-')` or `Some('=')` when the whole line is that character.
fn separator_fill(line: &str) -> Option<char> {
    let first = line.chars().next()?;
    if !matches!(first, '-' | '=') || line.len() < SEPARATOR_MIN {
        return None;
    }
    line.chars().all(|c| c == first).then_some(first)
}

#[cfg(test)]
#[path = "grammar_tests.rs"]
mod tests;
