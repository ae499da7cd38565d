// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test entity model.
//!
//! Nodes are stored in an arena owned by [`TestTree`]. Parent and child
//! links are [`NodeId`] indices into that arena, so the tree carries no
//! reference cycles and can be rebuilt wholesale on every discovery pass.
//!
//! Every node has a dotted path. A child's dotted path is its parent's path
//! followed by `.` and the child's local name; folders and files contribute
//! path segments (files without their extension), classes and methods
//! contribute identifiers. Synthetic pseudo-roots are the one exception:
//! they have an empty path and their children keep their real paths.

use std::ops::Index;
use std::path::PathBuf;

use serde::Serialize;

/// Index of a node inside its [`TestTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Top-level namespace grouping (first directory below the root).
    App,
    /// Nested directory grouping.
    Folder,
    /// Source file.
    File,
    /// Test class.
    Class,
    /// Test method or standalone test function.
    Method,
}

impl NodeKind {
    /// Directory-like groupings sort ahead of everything else.
    pub fn is_grouping(self) -> bool {
        matches!(self, NodeKind::App | NodeKind::Folder)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::App => "app",
            NodeKind::Folder => "folder",
            NodeKind::File => "file",
            NodeKind::Class => "class",
            NodeKind::Method => "method",
        }
    }
}

/// File reference plus a 1-based inclusive line range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub start_line: u32,
    pub end_line: u32,
}

/// One addressable unit in the test forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestNode {
    /// Display label (last path or identifier segment).
    pub name: String,
    pub kind: NodeKind,
    /// Stable hierarchical identifier, the key into the status store.
    pub dotted_path: String,
    /// Absent for synthetic nodes.
    pub location: Option<SourceLocation>,
    /// Non-owning back-reference.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl TestNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-backed forest of test nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestTree {
    nodes: Vec<TestNode>,
    roots: Vec<NodeId>,
}

impl TestTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pseudo-root (e.g. "failed tests") over `paths`.
    ///
    /// A path found in `source` is copied in with its whole subtree, so a
    /// failed class still shows (and aggregates) its methods. Other paths
    /// become method leaves addressed by their full dotted paths.
    pub fn synthetic<I, S>(label: &str, source: &TestTree, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tree = Self::new();
        let root = tree.push(TestNode {
            name: label.to_string(),
            kind: NodeKind::App,
            dotted_path: String::new(),
            location: None,
            parent: None,
            children: Vec::new(),
        });
        tree.roots.push(root);

        for path in paths {
            let path = path.into();
            if let Some(id) = source.find(&path) {
                tree.copy_from(source, id, Some(root));
                continue;
            }
            let name = path.rsplit('.').next().unwrap_or(&path).to_string();
            let child = tree.push(TestNode {
                name,
                kind: NodeKind::Method,
                dotted_path: path,
                location: None,
                parent: Some(root),
                children: Vec::new(),
            });
            tree.nodes[root.index()].children.push(child);
        }
        tree.sort();
        tree
    }

    /// Copy of the subtree rooted at `id`, keeping its full dotted paths.
    pub fn subtree(&self, id: NodeId) -> Self {
        let mut tree = Self::new();
        tree.copy_from(self, id, None);
        tree
    }

    /// Copy `source`'s subtree at `id` below `parent` (or as a new root).
    fn copy_from(&mut self, source: &TestTree, id: NodeId, parent: Option<NodeId>) -> NodeId {
        let top = self.push(TestNode {
            parent,
            children: Vec::new(),
            ..source[id].clone()
        });
        match parent {
            Some(p) => self.nodes[p.index()].children.push(top),
            None => self.roots.push(top),
        }

        let mut stack = vec![(id, top)];
        while let Some((from, copy)) = stack.pop() {
            for &child in &source[from].children {
                let new = self.push(TestNode {
                    parent: Some(copy),
                    children: Vec::new(),
                    ..source[child].clone()
                });
                self.nodes[copy.index()].children.push(new);
                stack.push((child, new));
            }
        }
        top
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&TestNode> {
        self.nodes.get(id.index())
    }

    /// All nodes in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TestNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Add a top-level node. Its dotted path is its name.
    pub fn insert_root(
        &mut self,
        name: impl Into<String>,
        kind: NodeKind,
        location: Option<SourceLocation>,
    ) -> NodeId {
        let name = name.into();
        let id = self.push(TestNode {
            dotted_path: name.clone(),
            name,
            kind,
            location,
            parent: None,
            children: Vec::new(),
        });
        self.roots.push(id);
        id
    }

    /// Add a node below `parent`, deriving its dotted path from the parent's.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        kind: NodeKind,
        location: Option<SourceLocation>,
    ) -> NodeId {
        let name = name.into();
        let dotted_path = format!("{}.{}", self[parent].dotted_path, name);
        let id = self.push(TestNode {
            name,
            kind,
            dotted_path,
            location,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    fn push(&mut self, node: TestNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Find a sibling by name: among the roots when `parent` is `None`,
    /// otherwise among `parent`'s children.
    pub fn find_child(&self, parent: Option<NodeId>, name: &str) -> Option<NodeId> {
        let siblings = match parent {
            Some(p) => &self[p].children,
            None => &self.roots,
        };
        siblings.iter().copied().find(|&id| self[id].name == name)
    }

    /// Look a node up by dotted path.
    pub fn find(&self, dotted_path: &str) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.dotted_path == dotted_path)
            .map(|(id, _)| id)
    }

    /// `id` and everything below it, in display (pre-)order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self[next].children.iter().rev().copied());
        }
        out
    }

    /// Leaves at or below `id`, in display order.
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self[n].is_leaf())
            .collect()
    }

    /// Every node of the forest in display order.
    pub fn walk(&self) -> Vec<NodeId> {
        self.roots
            .iter()
            .flat_map(|&root| self.descendants(root))
            .collect()
    }

    /// Depth of `id` (roots are at depth 0).
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self[id].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self[parent].parent;
        }
        depth
    }

    /// Apply the ordering rule at every level: groupings before everything
    /// else, then lexicographic by name.
    pub fn sort(&mut self) {
        let nodes = &self.nodes;
        let key = |id: &NodeId| {
            let node = &nodes[id.index()];
            (!node.kind.is_grouping(), node.name.clone())
        };

        let mut roots = std::mem::take(&mut self.roots);
        roots.sort_by_key(key);

        let mut children: Vec<Vec<NodeId>> = self
            .nodes
            .iter()
            .map(|node| {
                let mut c = node.children.clone();
                c.sort_by_key(key);
                c
            })
            .collect();

        for (node, sorted) in self.nodes.iter_mut().zip(children.iter_mut()) {
            node.children = std::mem::take(sorted);
        }
        self.roots = roots;
    }

    /// Structural fingerprint: `(depth, kind, dotted path)` in display order.
    ///
    /// Two forests with equal shapes contain the same node set in the same
    /// child order, independent of arena layout.
    pub fn shape(&self) -> Vec<(usize, NodeKind, String)> {
        self.walk()
            .into_iter()
            .map(|id| (self.depth(id), self[id].kind, self[id].dotted_path.clone()))
            .collect()
    }
}

impl Index<NodeId> for TestTree {
    type Output = TestNode;

    fn index(&self, id: NodeId) -> &TestNode {
        &self.nodes[id.index()]
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
