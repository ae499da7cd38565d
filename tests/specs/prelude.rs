//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for testing tally CLI behavior against throwaway
//! projects whose runner is a shell script printing canned output.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(dead_code)]

pub use assert_cmd::prelude::*;
pub use predicates;
pub use predicates::prelude::{Predicate, PredicateBooleanExt};
use std::path::Path;
use std::process::{Command, Output};

/// Returns a Command configured to run the tally binary
pub fn tally_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tally"));
    cmd.env_remove("TALLY_CONFIG").env_remove("TALLY_LOG");
    cmd
}

/// Dotted path of the failing test in [`Project::invoice`].
pub const TAX: &str = "billing.tests.test_invoice.InvoiceTests.test_tax";

/// Dotted path of the passing test in [`Project::invoice`].
pub const TOTAL: &str = "billing.tests.test_invoice.InvoiceTests.test_total";

const INVOICE_TESTS: &str = r#"import unittest


class InvoiceTests(unittest.TestCase):
    def test_total(self):
        self.assertEqual(100, 100)

    def test_tax(self):
        self.assertEqual(100, 110)
"#;

/// Full-suite output fails `test_tax`; any labelled run passes.
const RUNNER_SCRIPT: &str = r#"#!/bin/sh
if [ "$#" -eq 0 ]; then
cat <<'OUT'
test_tax (billing.tests.test_invoice.InvoiceTests) ... FAIL
test_total (billing.tests.test_invoice.InvoiceTests) ... ok

======================================================================
FAIL: test_tax (billing.tests.test_invoice.InvoiceTests)
----------------------------------------------------------------------
- 100
+ 110

----------------------------------------------------------------------
Ran 2 tests in 0.001s

FAILED (failures=1)
OUT
exit 1
fi
echo "test_tax (billing.tests.test_invoice.InvoiceTests) ... ok"
echo
echo "OK"
exit 0
"#;

const RUNNER_CONFIG: &str = r#"
[runner]
command = "sh"
args = ["runner.sh"]
"#;

// =============================================================================
// Project
// =============================================================================

/// Temporary test project directory with helper methods.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    /// Create an empty project with no files
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// One test class with a passing and a failing test, wired to the
    /// scripted runner.
    pub fn invoice() -> Self {
        let temp = Self::empty();
        temp.config(RUNNER_CONFIG);
        temp.file("runner.sh", RUNNER_SCRIPT);
        temp.file("billing/__init__.py", "");
        temp.file("billing/models.py", "class Invoice:\n    pass\n");
        temp.file("billing/tests/test_invoice.py", INVOICE_TESTS);
        temp
    }

    /// Get the project path
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write tally.toml (auto-prefixes with `version = 1` if not present)
    pub fn config(&self, content: &str) {
        let content = if content.contains("version") {
            content.to_string()
        } else {
            format!("version = 1\n{}", content)
        };
        std::fs::write(self.dir.path().join("tally.toml"), content).unwrap();
    }

    /// Write a file at the given path (parent directories created automatically)
    pub fn file(&self, path: impl AsRef<Path>, content: &str) {
        let full_path = self.dir.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full_path, content).unwrap();
    }

    /// `tally <args>` with this project as working directory
    pub fn cmd(&self, args: &[&str]) -> Command {
        let mut cmd = tally_cmd();
        cmd.args(args).current_dir(self.path());
        cmd
    }
}

// =============================================================================
// Assertions
// =============================================================================

/// Captured output of a finished command.
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.output.stdout).expect("valid JSON")
    }

    pub fn stdout_has<I, P>(self, pred: I) -> Self
    where
        I: IntoStrPredicate<P>,
        P: Predicate<str>,
    {
        let stdout = self.stdout();
        assert!(
            pred.into_predicate().eval(&stdout),
            "stdout does not match\nstdout: {}",
            stdout
        );
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(needle),
            "stdout unexpectedly contains {:?}\nstdout: {}",
            needle,
            stdout
        );
        self
    }

    pub fn stderr_has<I, P>(self, pred: I) -> Self
    where
        I: IntoStrPredicate<P>,
        P: Predicate<str>,
    {
        let stderr = self.stderr();
        assert!(
            pred.into_predicate().eval(&stderr),
            "stderr does not match\nstderr: {}",
            stderr
        );
        self
    }
}

/// Trait for converting into a string predicate.
/// Allows passing `&str` (as contains) or any `Predicate<str>`.
pub trait IntoStrPredicate<P: Predicate<str>> {
    fn into_predicate(self) -> P;
}

impl IntoStrPredicate<predicates::str::ContainsPredicate> for &str {
    fn into_predicate(self) -> predicates::str::ContainsPredicate {
        predicates::str::contains(self)
    }
}

impl<P: Predicate<str>> IntoStrPredicate<P> for P {
    fn into_predicate(self) -> P {
        self
    }
}

/// Run and require exit code `code`.
pub fn exits(mut cmd: Command, code: i32) -> RunAssert {
    let output = cmd.output().expect("command should run");
    assert_eq!(
        output.status.code(),
        Some(code),
        "expected exit code {}, got {:?}\nstdout: {}\nstderr: {}",
        code,
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    RunAssert { output }
}
