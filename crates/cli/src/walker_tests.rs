#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::test_utils::create_tree;
use std::fs;
use tempfile::TempDir;

fn create_test_tree(dir: &Path) {
    create_tree(
        dir,
        &[
            ("billing/tests/test_invoice.py", "def test_a():\n    pass\n"),
            ("billing/models.py", "class Invoice:\n    pass\n"),
            ("test_root.py", "def test_b():\n    pass\n"),
        ],
    );
}

fn relative_paths(files: &[WalkedFile]) -> Vec<String> {
    files
        .iter()
        .map(|f| f.relative.to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn walks_matching_files_only() {
    let tmp = TempDir::new().unwrap();
    create_test_tree(tmp.path());

    let walker = FileWalker::new(WalkerConfig::default()).unwrap();
    let (files, stats) = walker.walk_collect(tmp.path());

    assert_eq!(
        relative_paths(&files),
        vec!["billing/tests/test_invoice.py", "test_root.py"]
    );
    assert_eq!(stats.files_found, 2);
    assert_eq!(stats.files_unmatched, 1);
}

#[test]
fn respects_gitignore() {
    let tmp = TempDir::new().unwrap();
    create_test_tree(tmp.path());

    // Add .gitignore
    fs::write(tmp.path().join(".gitignore"), "billing/\n").unwrap();

    // Init git repo so gitignore is respected
    fs::create_dir(tmp.path().join(".git")).unwrap();

    let walker = FileWalker::new(WalkerConfig::default()).unwrap();
    let (files, _) = walker.walk_collect(tmp.path());

    assert_eq!(relative_paths(&files), vec!["test_root.py"]);
}

#[test]
fn respects_depth_limit() {
    let tmp = TempDir::new().unwrap();
    create_tree(
        tmp.path(),
        &[
            ("level1/level2/level3/test_deep.py", ""),
            ("test_shallow.py", ""),
        ],
    );

    let walker = FileWalker::new(WalkerConfig {
        max_depth: Some(2),
        git_ignore: false,
        hidden: false,
        ..Default::default()
    })
    .unwrap();
    let (files, _) = walker.walk_collect(tmp.path());

    assert_eq!(relative_paths(&files), vec!["test_shallow.py"]);
}

#[test]
fn exclude_patterns_skip_subtrees() {
    let tmp = TempDir::new().unwrap();
    create_test_tree(tmp.path());
    create_tree(tmp.path(), &[("vendor/lib/test_vendored.py", "")]);

    let walker = FileWalker::new(WalkerConfig {
        exclude_patterns: vec!["vendor/**".to_string()],
        git_ignore: false,
        hidden: false,
        ..Default::default()
    })
    .unwrap();
    let (files, _) = walker.walk_collect(tmp.path());

    assert!(
        files.iter().all(|f| !f.relative.starts_with("vendor")),
        "expected no vendor files but found: {:?}",
        relative_paths(&files)
    );
}

#[test]
fn skips_virtualenv_directories() {
    let tmp = TempDir::new().unwrap();
    create_tree(
        tmp.path(),
        &[
            ("venv/lib/site-packages/pkg/test_pkg.py", ""),
            ("__pycache__/test_cached.py", ""),
            ("app/test_app.py", ""),
        ],
    );

    let walker = FileWalker::new(WalkerConfig {
        git_ignore: false,
        ..Default::default()
    })
    .unwrap();
    let (files, _) = walker.walk_collect(tmp.path());

    assert_eq!(relative_paths(&files), vec!["app/test_app.py"]);
}

#[test]
fn tracks_file_depth() {
    let tmp = TempDir::new().unwrap();
    create_tree(
        tmp.path(),
        &[
            ("test_root.py", ""),
            ("a/test_level1.py", ""),
            ("a/b/test_level2.py", ""),
        ],
    );

    let walker = FileWalker::new(WalkerConfig {
        git_ignore: false,
        hidden: false,
        ..Default::default()
    })
    .unwrap();
    let (mut files, _) = walker.walk_collect(tmp.path());

    assert_eq!(files.len(), 3);
    files.sort_by_key(|f| f.depth);

    assert_eq!(files[0].depth, 1); // test_root.py
    assert_eq!(files[1].depth, 2); // a/test_level1.py
    assert_eq!(files[2].depth, 3); // a/b/test_level2.py
}

#[test]
fn parallel_mode_finds_the_same_files() {
    let tmp = TempDir::new().unwrap();
    create_test_tree(tmp.path());

    let sequential = FileWalker::new(WalkerConfig::default()).unwrap();
    let parallel = FileWalker::new(WalkerConfig {
        force_parallel: true,
        ..Default::default()
    })
    .unwrap();

    let (a, _) = sequential.walk_collect(tmp.path());
    let (b, _) = parallel.walk_collect(tmp.path());
    assert_eq!(a, b);
}

#[test]
fn handles_empty_directory() {
    let tmp = TempDir::new().unwrap();

    let walker = FileWalker::new(WalkerConfig::default()).unwrap();
    let (files, stats) = walker.walk_collect(tmp.path());

    assert!(files.is_empty());
    assert_eq!(stats.files_found, 0);
    assert_eq!(stats.errors, 0);
}

#[test]
fn invalid_pattern_is_a_config_error() {
    let result = FileWalker::new(WalkerConfig {
        include: "**/[".to_string(),
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::Config { .. })));
}

#[test]
fn from_discovery_config() {
    let discovery = DiscoveryConfig {
        pattern: "**/tests.py".to_string(),
        exclude: vec!["migrations/**".to_string()],
        ..DiscoveryConfig::default()
    };

    let config = WalkerConfig::from_discovery(&discovery);
    assert_eq!(config.include, "**/tests.py");
    assert_eq!(config.exclude_patterns, discovery.exclude);

    let walker = FileWalker::new(config).unwrap();
    let root = Path::new("/proj");
    assert!(walker.matches(root, Path::new("shop/tests.py")));
    assert!(!walker.matches(root, Path::new("shop/test_models.py")));
    assert!(!walker.matches(root, Path::new("migrations/shop/tests.py")));
}

#[test]
fn matches_skips_what_the_walk_skips() {
    let tmp = TempDir::new().unwrap();
    create_tree(
        tmp.path(),
        &[
            ("billing/test_invoice.py", "def test_a():\n    pass\n"),
            ("legacy/test_old.py", "def test_b():\n    pass\n"),
            (".venv/lib/test_vendored.py", "def test_c():\n    pass\n"),
            ("venv/lib/test_pinned.py", "def test_d():\n    pass\n"),
            ("billing/__pycache__/test_cached.py", "def test_e():\n    pass\n"),
            ("billing/.test_hidden.py", "def test_f():\n    pass\n"),
        ],
    );
    let walker = FileWalker::new(WalkerConfig {
        exclude_patterns: vec!["legacy/**".to_string()],
        ..WalkerConfig::default()
    })
    .unwrap();

    let (files, _) = walker.walk_collect(tmp.path());
    let walked = relative_paths(&files);
    assert_eq!(walked, vec!["billing/test_invoice.py"]);

    for rel in [
        "billing/test_invoice.py",
        "legacy/test_old.py",
        ".venv/lib/test_vendored.py",
        "venv/lib/test_pinned.py",
        "billing/__pycache__/test_cached.py",
        "billing/.test_hidden.py",
    ] {
        assert_eq!(
            walker.matches(tmp.path(), Path::new(rel)),
            walked.iter().any(|w| w == rel),
            "{}",
            rel
        );
    }
}
