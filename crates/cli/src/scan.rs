// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-file test scanner.
//!
//! Locates test classes and test methods with line-oriented pattern
//! matching instead of parsing the language. False positives and false
//! negatives are accepted in exchange for speed.
//!
//! Scanning keeps a "current class" cursor:
//! - a test-like class declaration opens a class and moves the cursor to it;
//! - any other class declaration, or a dedent back to the class's own
//!   indentation, closes the cursor;
//! - a method with the configured prefix is attached to the open class,
//!   or to the file itself when no class is open.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::DiscoveryConfig;
use crate::error::{Error, Result};

/// `class Name(Base, other.Base):`, tolerating a declaration that wraps.
#[allow(clippy::expect_used)]
static CLASS_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)class\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:\(([^)]*))?").expect("valid regex")
});

/// `def name(` or `async def name(`.
#[allow(clippy::expect_used)]
static METHOD_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(?:async\s+)?def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("valid regex")
});

/// A test method or standalone test function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMethod {
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// A test class with the methods attributed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedClass {
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    pub methods: Vec<ParsedMethod>,
}

/// Scan result for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    /// Path relative to the discovery root.
    pub path: PathBuf,
    /// File stem, the file's segment in dotted paths.
    pub module: String,
    pub classes: Vec<ParsedClass>,
    /// Standalone test functions outside any class.
    pub functions: Vec<ParsedMethod>,
    pub line_count: u32,
}

impl ParsedFile {
    /// Directory segments between the root and the file.
    pub fn dir_segments(&self) -> Vec<String> {
        self.path
            .parent()
            .map(|dir| {
                dir.components()
                    .filter_map(|c| match c {
                        std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total methods and functions captured.
    pub fn method_count(&self) -> usize {
        self.functions.len() + self.classes.iter().map(|c| c.methods.len()).sum::<usize>()
    }
}

/// What an open indentation block belongs to.
#[derive(Debug, Clone, Copy)]
enum BlockOwner {
    Class(usize),
    ClassMethod(usize, usize),
    Function(usize),
}

#[derive(Debug)]
struct Block {
    indent: usize,
    owner: BlockOwner,
}

/// Line scanner configured with the project's naming rules.
#[derive(Debug, Clone)]
pub struct Scanner {
    method_prefix: String,
    class_prefix: String,
    base_classes: HashSet<String>,
}

impl Scanner {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            method_prefix: config.method_prefix.clone(),
            class_prefix: config.class_prefix.clone(),
            base_classes: config.base_classes.iter().cloned().collect(),
        }
    }

    /// Read and scan `root/rel`.
    ///
    /// Returns `Ok(None)` when the file contains no test methods.
    pub fn scan_path(&self, root: &Path, rel: &Path) -> Result<Option<ParsedFile>> {
        let full = root.join(rel);
        let bytes = std::fs::read(&full).map_err(|source| Error::Io { path: full, source })?;
        Ok(self.scan_source(rel, &String::from_utf8_lossy(&bytes)))
    }

    /// Scan already-loaded source text.
    pub fn scan_source(&self, rel: &Path, text: &str) -> Option<ParsedFile> {
        let module = rel.file_stem()?.to_string_lossy().into_owned();

        let mut classes: Vec<ParsedClass> = Vec::new();
        let mut functions: Vec<ParsedMethod> = Vec::new();
        let mut seen_test_classes: HashSet<String> = HashSet::new();
        let mut blocks: Vec<Block> = Vec::new();
        let mut open_class: Option<usize> = None;
        let mut last_code_line = 0u32;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx as u32 + 1;
            let trimmed = raw.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            // Closing brackets continue a wrapped declaration.
            if trimmed.starts_with([')', ']', '}']) {
                last_code_line = line_no;
                continue;
            }
            let indent = raw.len() - trimmed.len();

            while let Some(block) = blocks.last() {
                if indent > block.indent {
                    break;
                }
                if let Some(block) = blocks.pop() {
                    close_block(&mut classes, &mut functions, block.owner, last_code_line);
                    if let BlockOwner::Class(ci) = block.owner
                        && open_class == Some(ci)
                    {
                        open_class = None;
                    }
                }
            }

            if let Some(caps) = CLASS_DECL.captures(raw) {
                let name = caps.get(2).map_or("", |m| m.as_str());
                let bases = caps.get(3).map_or("", |m| m.as_str());
                if self.is_test_class(name, bases, &seen_test_classes) {
                    seen_test_classes.insert(name.to_string());
                    classes.push(ParsedClass {
                        name: name.to_string(),
                        start_line: line_no,
                        end_line: line_no,
                        methods: Vec::new(),
                    });
                    let ci = classes.len() - 1;
                    open_class = Some(ci);
                    blocks.push(Block {
                        indent,
                        owner: BlockOwner::Class(ci),
                    });
                } else {
                    open_class = None;
                }
            } else if let Some(caps) = METHOD_DECL.captures(raw) {
                let name = caps.get(2).map_or("", |m| m.as_str());
                if name.starts_with(&self.method_prefix) {
                    let method = ParsedMethod {
                        name: name.to_string(),
                        start_line: line_no,
                        end_line: line_no,
                    };
                    let owner = match open_class {
                        Some(ci) => {
                            classes[ci].methods.push(method);
                            BlockOwner::ClassMethod(ci, classes[ci].methods.len() - 1)
                        }
                        None => {
                            functions.push(method);
                            BlockOwner::Function(functions.len() - 1)
                        }
                    };
                    blocks.push(Block { indent, owner });
                }
            }

            last_code_line = line_no;
        }

        while let Some(block) = blocks.pop() {
            close_block(&mut classes, &mut functions, block.owner, last_code_line);
        }

        let parsed = ParsedFile {
            path: rel.to_path_buf(),
            module,
            classes,
            functions,
            line_count: text.lines().count() as u32,
        };

        if parsed.method_count() == 0 {
            tracing::trace!("{}: no test methods", rel.display());
            return None;
        }
        Some(parsed)
    }

    /// Test-like: the name has the class prefix, or a declared base is a
    /// known test base (compared with and without its namespace), a
    /// `*TestCase` type, or a test class declared earlier in the file.
    fn is_test_class(&self, name: &str, bases: &str, seen: &HashSet<String>) -> bool {
        if !self.class_prefix.is_empty() && name.starts_with(&self.class_prefix) {
            return true;
        }

        bases
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty() && !b.contains('='))
            .any(|base| {
                let local = base.rsplit('.').next().unwrap_or(base);
                self.base_classes.contains(base)
                    || self.base_classes.contains(local)
                    || local.ends_with("TestCase")
                    || seen.contains(local)
            })
    }
}

fn close_block(
    classes: &mut [ParsedClass],
    functions: &mut [ParsedMethod],
    owner: BlockOwner,
    end_line: u32,
) {
    match owner {
        BlockOwner::Class(ci) => {
            let class = &mut classes[ci];
            class.end_line = end_line.max(class.start_line);
        }
        BlockOwner::ClassMethod(ci, mi) => {
            let method = &mut classes[ci].methods[mi];
            method.end_line = end_line.max(method.start_line);
        }
        BlockOwner::Function(fi) => {
            let function = &mut functions[fi];
            function.end_line = end_line.max(function.start_line);
        }
    }
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
