//! Shared unit test utilities.
//!
//! Provides common helpers for unit tests in the cli crate.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Creates a temp directory with a minimal tally.toml.
pub fn temp_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("tally.toml"), "version = 1\n").unwrap();
    dir
}

/// Creates a directory tree from a list of (path, content) pairs.
///
/// Parent directories are created automatically.
///
/// # Example
///
/// ```ignore
/// let tmp = temp_project();
/// create_tree(tmp.path(), &[
///     ("billing/tests/test_invoice.py", "class InvoiceTests(TestCase): ..."),
///     ("billing/models.py", "class Invoice: ..."),
/// ]);
/// ```
pub fn create_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full_path = root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full_path, content).unwrap();
    }
}

/// A small Django-style project with two apps.
pub fn sample_project() -> TempDir {
    let tmp = temp_project();
    create_tree(
        tmp.path(),
        &[
            (
                "billing/tests/test_invoice.py",
                "from django.test import TestCase\n\n\
                 class InvoiceTests(TestCase):\n    \
                 def test_total(self):\n        pass\n\n    \
                 def test_tax(self):\n        pass\n",
            ),
            (
                "billing/tests/test_refund.py",
                "def test_refund():\n    assert True\n",
            ),
            ("billing/models.py", "class Invoice:\n    pass\n"),
            (
                "accounts/test_login.py",
                "class TestLogin:\n    def test_ok(self):\n        pass\n",
            ),
            ("accounts/test_empty.py", "# nothing here\n"),
        ],
    );
    tmp
}
