// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use termcolor::NoColor;

use super::{FormatOptions, TextFormatter};
use crate::aggregate::StatusCounts;
use crate::index::DiscoveryReport;
use crate::node::{NodeKind, SourceLocation, TestTree};
use crate::session::RunReport;
use crate::status::{Status, StatusEntry, StatusStore};

/// billing > test_invoice > InvoiceTests > {test_tax, test_total}
fn invoice_tree() -> TestTree {
    let mut tree = TestTree::new();
    let app = tree.insert_root("billing", NodeKind::App, None);
    let file = tree.insert_child(
        app,
        "test_invoice",
        NodeKind::File,
        Some(SourceLocation {
            file: PathBuf::from("billing/test_invoice.py"),
            start_line: 1,
            end_line: 12,
        }),
    );
    let class = tree.insert_child(file, "InvoiceTests", NodeKind::Class, None);
    tree.insert_child(class, "test_total", NodeKind::Method, None);
    tree.insert_child(class, "test_tax", NodeKind::Method, None);
    tree.sort();
    tree
}

fn render(options: FormatOptions, f: impl FnOnce(&mut TextFormatter<NoColor<Vec<u8>>>)) -> String {
    let mut formatter = TextFormatter::new(NoColor::new(Vec::new()), options);
    f(&mut formatter);
    String::from_utf8(formatter.into_inner().into_inner()).unwrap()
}

fn report(counts: StatusCounts, cancelled: bool) -> RunReport {
    RunReport {
        label: "all tests".to_string(),
        started_at: Utc::now(),
        elapsed_ms: 1250,
        exit: None,
        cancelled,
        counts,
        lines: 0,
    }
}

#[test]
fn tree_shows_derived_statuses_and_diffs() {
    let tree = invoice_tree();
    let store = StatusStore::new();
    store.set_status("billing.test_invoice.InvoiceTests.test_total", Status::Passed);
    store.set_duration(
        "billing.test_invoice.InvoiceTests.test_total",
        Duration::from_millis(3),
    );
    store.set_status("billing.test_invoice.InvoiceTests.test_tax", Status::Failed);
    store.set_diff("billing.test_invoice.InvoiceTests.test_tax", "100", "110");

    let text = render(FormatOptions::default(), |f| f.write_tree(&tree, &store).unwrap());
    similar_asserts::assert_eq!(
        text,
        "\
billing  failed
  test_invoice  failed
    InvoiceTests  failed
      test_tax  failed
        - 100
        + 110
      test_total  passed  3ms
"
    );
}

#[test]
fn detail_is_truncated_to_limit() {
    let tree = invoice_tree();
    let store = StatusStore::new();
    let path = "billing.test_invoice.InvoiceTests.test_tax";
    store.set_status(path, Status::Failed);
    store.set_failure_detail(path, "Traceback\n  line 1\n  line 2\nAssertionError");

    let text = render(FormatOptions::default().with_detail_limit(2), |f| {
        f.write_tree(&tree, &store).unwrap()
    });
    assert!(text.contains("        Traceback\n          line 1\n"), "{text}");
    assert!(text.contains("... 2 more lines"), "{text}");
    assert!(!text.contains("AssertionError"));
}

#[test]
fn locations_are_optional() {
    let tree = invoice_tree();
    let store = StatusStore::new();

    let plain = render(FormatOptions::default(), |f| f.write_tree(&tree, &store).unwrap());
    assert!(!plain.contains("test_invoice.py"));

    let located = render(FormatOptions::default().with_locations(true), |f| {
        f.write_tree(&tree, &store).unwrap()
    });
    assert!(located.contains("test_invoice  unknown  billing/test_invoice.py:1"));
}

#[test]
fn pseudo_root_aggregates_its_children() {
    let tree = TestTree::synthetic("failed tests", &TestTree::new(), ["a.test_x", "b.test_y"]);
    let store = StatusStore::new();
    store.set_status("a.test_x", Status::Passed);
    store.set_status("b.test_y", Status::Running);

    let text = render(FormatOptions::default(), |f| f.write_tree(&tree, &store).unwrap());
    similar_asserts::assert_eq!(
        text,
        "failed tests  running\n  test_x  passed\n  test_y  running\n"
    );
}

#[test]
fn transition_line() {
    let entry = StatusEntry {
        status: Status::Passed,
        duration_ms: Some(12),
        ..StatusEntry::default()
    };
    let text = render(FormatOptions::default(), |f| {
        f.write_transition("pkg.test_mod.test_x", &entry).unwrap()
    });
    assert_eq!(text, " passed  pkg.test_mod.test_x  12ms\n");
}

#[test]
fn run_summary_lists_non_zero_counts() {
    let counts = StatusCounts {
        passed: 3,
        failed: 1,
        ..StatusCounts::default()
    };
    let text = render(FormatOptions::default(), |f| {
        f.write_run_summary(&report(counts, false)).unwrap()
    });
    assert_eq!(text, "3 passed, 1 failed in 1.25s\n");
}

#[test]
fn run_summary_marks_cancellation() {
    let counts = StatusCounts {
        aborted: 2,
        ..StatusCounts::default()
    };
    let text = render(FormatOptions::default(), |f| {
        f.write_run_summary(&report(counts, true)).unwrap()
    });
    assert_eq!(text, "2 aborted in 1.25s (cancelled)\n");
}

#[test]
fn discovery_summary() {
    let report = DiscoveryReport {
        tree: invoice_tree(),
        files_scanned: 3,
        files_with_tests: 1,
        errors: Vec::new(),
    };
    let text = render(FormatOptions::default(), |f| {
        f.write_discovery_summary(&report).unwrap()
    });
    assert_eq!(text, "2 tests in 1 file\n");
}

#[test]
fn empty_discovery_summary() {
    let text = render(FormatOptions::default(), |f| {
        f.write_discovery_summary(&DiscoveryReport::default()).unwrap()
    });
    assert_eq!(text, "no tests found\n");
}
