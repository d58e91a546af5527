//! Storage server registration.
//!
//! A storage server registers once, identified by its command stub, and advertises the
//! files it already holds. The first server to advertise a path owns it; anything that
//! clashes with the tree as it stands is handed back as a duplicate for the server to
//! delete locally.

use crate::tree::{DirectoryTree, Node};
use dfs_api::{CommandStub, NamingError, NamingResult, StorageStub};
use dfs_common::Path;
use std::collections::HashSet;
use std::fmt;

/// A registered storage server: the stub given to clients and the stub used to command it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Owner {
    pub storage: StorageStub,
    pub command: CommandStub,
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.storage.host(), self.storage.port())
    }
}

/// The set of registered storage servers.
#[derive(Debug, Default)]
pub struct Registry {
    commands: HashSet<CommandStub>,
    servers: Vec<Owner>,
    next: usize,
}

impl Registry {
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Adds a server.
    ///
    /// # Errors
    ///
    /// Returns [`NamingError::AlreadyRegistered`] if its command stub is already known.
    pub fn admit(&mut self, owner: &Owner) -> NamingResult<()> {
        if !self.commands.insert(owner.command.clone()) {
            return Err(NamingError::AlreadyRegistered);
        }
        self.servers.push(owner.clone());
        Ok(())
    }

    /// Picks the server to hold a new file, cycling through servers in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`NamingError::NoStorageServers`] if nothing has registered.
    pub fn next_server(&mut self) -> NamingResult<Owner> {
        if self.servers.is_empty() {
            return Err(NamingError::NoStorageServers);
        }
        let owner = self.servers[self.next % self.servers.len()].clone();
        self.next = self.next.wrapping_add(1);
        Ok(owner)
    }
}

/// Merges a server's advertised files into the tree.
///
/// Returns the advertised paths that were rejected. A path is rejected when it already
/// exists (unless it is a file this same server advertised earlier), when something
/// already exists beneath it, or when one of its ancestors is a file. Accepted paths get
/// any missing ancestor directories, attributed to `owner`. The root is ignored.
pub fn merge(tree: &mut DirectoryTree<Owner>, owner: &Owner, paths: &[Path]) -> Vec<Path> {
    let mut duplicates = Vec::new();

    for path in paths {
        if path.is_root() {
            continue;
        }
        if clashes(tree, owner, path) {
            duplicates.push(path.clone());
            continue;
        }

        for ancestor in path.ancestors() {
            tree.insert_if_absent(ancestor, Node::directory(Some(owner.clone())));
        }
        tree.insert(path.clone(), Node::file(owner.clone()));
    }

    duplicates
}

fn clashes(tree: &DirectoryTree<Owner>, owner: &Owner, path: &Path) -> bool {
    if let Some(node) = tree.get(path) {
        return !(node.is_file() && node.owner() == Some(owner));
    }
    tree.has_descendants(path) || path.ancestors().any(|a| tree.is_file(&a))
}
