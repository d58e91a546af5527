//! The naming server's directory tree.
//!
//! The tree is a sorted map from path to node. Directories that exist only because
//! something beneath them was registered need not have a node of their own: a path is an
//! implicit directory when some node has it as a strict prefix. Because paths order
//! component-wise, the descendants of a path form one contiguous run of keys directly
//! after it, so every prefix query is a single range scan.

use dfs_common::Path;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// A single entry in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<O> {
    is_directory: bool,
    owner: Option<O>,
}

impl<O> Node<O> {
    /// A file held by `owner`.
    pub fn file(owner: O) -> Self {
        Self {
            is_directory: false,
            owner: Some(owner),
        }
    }

    /// A directory, optionally attributed to the server whose registration created it.
    pub fn directory(owner: Option<O>) -> Self {
        Self {
            is_directory: true,
            owner,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory
    }

    pub fn owner(&self) -> Option<&O> {
        self.owner.as_ref()
    }
}

/// Directory tree keyed by path, generic over the owner recorded on each node.
#[derive(Debug, Clone)]
pub struct DirectoryTree<O> {
    nodes: BTreeMap<Path, Node<O>>,
}

impl<O> Default for DirectoryTree<O> {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }
}

impl<O> DirectoryTree<O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&Node<O>> {
        self.nodes.get(path)
    }

    /// Returns `true` if a file node exists at `path`.
    pub fn is_file(&self, path: &Path) -> bool {
        self.nodes.get(path).is_some_and(Node::is_file)
    }

    /// Classifies `path`.
    ///
    /// Returns `Some(true)` for the root, a directory node or an implicit directory,
    /// `Some(false)` for a file and `None` if the path does not exist.
    pub fn is_directory(&self, path: &Path) -> Option<bool> {
        if path.is_root() {
            return Some(true);
        }
        match self.nodes.get(path) {
            Some(node) => Some(node.is_directory()),
            None if self.has_descendants(path) => Some(true),
            None => None,
        }
    }

    /// Returns `true` if `path` exists, explicitly or implicitly.
    pub fn exists(&self, path: &Path) -> bool {
        self.is_directory(path).is_some()
    }

    /// Returns `true` if some node has `path` as a strict prefix.
    pub fn has_descendants(&self, path: &Path) -> bool {
        self.descendants(path).next().is_some()
    }

    /// Iterates over every node strictly beneath `path`, in path order.
    pub fn descendants<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Iterator<Item = (&'a Path, &'a Node<O>)> {
        self.nodes
            .range((Bound::Excluded(path), Bound::Unbounded))
            .take_while(move |(key, _)| key.is_subpath(path))
    }

    /// Names of the entries directly inside `directory`, whether or not they have nodes.
    pub fn children(&self, directory: &Path) -> BTreeSet<String> {
        self.descendants(directory)
            .filter_map(|(key, _)| key.component_after(directory))
            .map(str::to_owned)
            .collect()
    }

    /// Inserts or replaces the node at `path`.
    pub fn insert(&mut self, path: Path, node: Node<O>) {
        self.nodes.insert(path, node);
    }

    /// Inserts a node at `path` unless one is already there.
    ///
    /// Returns `true` if the node was inserted.
    pub fn insert_if_absent(&mut self, path: Path, node: Node<O>) -> bool {
        match self.nodes.entry(path) {
            Entry::Vacant(slot) => {
                slot.insert(node);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Removes `path` and everything beneath it, returning the removed nodes.
    pub fn remove_subtree(&mut self, path: &Path) -> Vec<(Path, Node<O>)> {
        let keys: Vec<Path> = self
            .nodes
            .range(path..)
            .take_while(|(key, _)| key.is_subpath(path))
            .map(|(key, _)| key.clone())
            .collect();

        keys.into_iter()
            .filter_map(|key| self.nodes.remove_entry(&key))
            .collect()
    }
}
