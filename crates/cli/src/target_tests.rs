// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Instant;

use super::*;
use crate::aggregate::forest_status;
use crate::config::RunnerConfig;
use crate::node::NodeKind;
use crate::process::ExitOutcome;
use crate::status::Status;
use crate::stream::StreamParser;

/// billing > tests > test_invoice > InvoiceTests > {test_tax, test_total}
fn invoice_tree() -> TestTree {
    let mut tree = TestTree::new();
    let app = tree.insert_root("billing", NodeKind::App, None);
    let folder = tree.insert_child(app, "tests", NodeKind::Folder, None);
    let file = tree.insert_child(folder, "test_invoice", NodeKind::File, None);
    let class = tree.insert_child(file, "InvoiceTests", NodeKind::Class, None);
    tree.insert_child(class, "test_total", NodeKind::Method, None);
    tree.insert_child(class, "test_tax", NodeKind::Method, None);
    tree.sort();
    tree
}

const CLASS: &str = "billing.tests.test_invoice.InvoiceTests";
const TAX: &str = "billing.tests.test_invoice.InvoiceTests.test_tax";
const TOTAL: &str = "billing.tests.test_invoice.InvoiceTests.test_total";

#[test]
fn suite_observes_everything_without_labels() {
    let scope = RunScope::resolve(&RunTarget::Suite, &invoice_tree(), &StatusStore::new()).unwrap();
    assert!(scope.labels.is_empty());
    assert_eq!(scope.root_path, None);
    assert_eq!(scope.leaves, vec![TAX, TOTAL]);
    assert_eq!(scope.composites.len(), 4);
    assert_eq!(scope.leaf_target(), None);
    assert_eq!(scope.label, SUITE_LABEL);
}

#[test]
fn suite_on_empty_tree_is_no_tests() {
    let err = RunScope::resolve(&RunTarget::Suite, &TestTree::new(), &StatusStore::new())
        .unwrap_err();
    assert!(matches!(err, Error::NoTests));
}

#[test]
fn node_target_scopes_to_its_subtree() {
    let scope = RunScope::resolve(
        &RunTarget::Node(CLASS.to_string()),
        &invoice_tree(),
        &StatusStore::new(),
    )
    .unwrap();
    assert_eq!(scope.labels, vec![CLASS]);
    assert_eq!(scope.composites, vec![CLASS]);
    assert_eq!(scope.leaves, vec![TAX, TOTAL]);
    assert!(!scope.root_is_leaf);
    assert_eq!(scope.label, "InvoiceTests");
}

#[test]
fn leaf_target_is_reported() {
    let scope = RunScope::resolve(
        &RunTarget::Node(TAX.to_string()),
        &invoice_tree(),
        &StatusStore::new(),
    )
    .unwrap();
    assert_eq!(scope.leaf_target(), Some(TAX));
    assert!(scope.composites.is_empty());
}

#[test]
fn unknown_node_is_an_argument_error() {
    let err = RunScope::resolve(
        &RunTarget::Node("billing.nope".to_string()),
        &invoice_tree(),
        &StatusStore::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Argument(msg) if msg.contains("billing.nope")));
}

#[test]
fn failed_target_uses_outermost_failed_paths() {
    let store = StatusStore::new();
    store.set_status(CLASS, Status::Failed);
    store.set_status(TAX, Status::Failed);
    store.set_status(TOTAL, Status::Passed);
    store.set_status("billing.tests.test_gone.test_old", Status::Failed);

    let scope = RunScope::resolve(&RunTarget::Failed, &invoice_tree(), &store).unwrap();
    assert_eq!(
        scope.labels,
        vec!["billing.tests.test_gone.test_old", CLASS]
    );
    assert_eq!(scope.leaves, vec!["billing.tests.test_gone.test_old", TAX, TOTAL]);
    assert_eq!(scope.composites, vec![CLASS]);
    assert_eq!(scope.label, FAILED_LABEL);

    let tree = scope.synthetic_tree(&invoice_tree());
    let root = tree.roots()[0];
    assert_eq!(tree[root].name, FAILED_LABEL);
    assert_eq!(tree[root].children.len(), 2);
}

#[test]
fn rerun_of_failed_class_aggregates_its_methods() {
    let tree = invoice_tree();
    let store = Arc::new(StatusStore::new());
    store.set_status(CLASS, Status::Failed);

    let scope = RunScope::resolve(&RunTarget::Failed, &tree, &store).unwrap();
    let display = scope.synthetic_tree(&tree);

    let mut parser = StreamParser::new(Arc::clone(&store), scope);
    parser.begin();
    parser.push_chunk(b"test_tax (billing.tests.test_invoice.InvoiceTests) ... FAIL\n");
    parser.flush_at(Instant::now());
    parser.finalize(ExitOutcome::Exited(1), false);

    assert_eq!(store.get_status(TAX), Some(Status::Failed));
    assert_eq!(forest_status(&display, &store), Status::Failed);
}

#[test]
fn failed_target_without_failures_is_no_tests() {
    let err = RunScope::resolve(&RunTarget::Failed, &invoice_tree(), &StatusStore::new())
        .unwrap_err();
    assert!(matches!(err, Error::NoTests));
}

#[test]
fn sibling_prefix_is_not_an_ancestor() {
    let kept = outermost(vec!["a.test_x".to_string(), "a.test_xy".to_string()]);
    assert_eq!(kept, vec!["a.test_x", "a.test_xy"]);
}

#[test]
fn invocation_appends_fail_fast_then_labels() {
    let scope = RunScope {
        labels: vec![TAX.to_string()],
        ..RunScope::default()
    };
    let mut config = RunnerConfig::default();
    config.cwd = Some("src".to_string());
    config
        .env
        .insert("DJANGO_SETTINGS_MODULE".to_string(), "app.settings".to_string());

    let invocation = Invocation::new(&config, Path::new("/proj"), &scope, true);
    assert_eq!(invocation.command, "python");
    assert_eq!(
        invocation.args,
        vec!["-m", "unittest", "-v", "--failfast", TAX]
    );
    assert_eq!(invocation.cwd, PathBuf::from("/proj/src"));
    assert_eq!(invocation.env.len(), 1);
    assert_eq!(
        invocation.display(),
        format!("python -m unittest -v --failfast {TAX}")
    );
}

#[test]
fn invocation_without_fail_fast() {
    let invocation = Invocation::new(
        &RunnerConfig::default(),
        Path::new("/proj"),
        &RunScope::default(),
        false,
    );
    assert_eq!(invocation.args, vec!["-m", "unittest", "-v"]);
    assert_eq!(invocation.cwd, PathBuf::from("/proj"));
}
