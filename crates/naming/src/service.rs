//! Naming server logic.
//!
//! [`NamingService`] owns the directory tree and the storage server registry and
//! implements both naming interfaces on top of them. All state sits behind one mutex:
//! each operation, including any commands it sends to storage servers, runs as a single
//! critical section.

use crate::registration::{self, Owner, Registry};
use crate::tree::{DirectoryTree, Node};
use dfs_api::{
    Command, CommandStub, NamingError, NamingResult, Registration, Service, StorageStub,
};
use dfs_common::Path;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct State {
    tree: DirectoryTree<Owner>,
    registry: Registry,
}

impl State {
    /// Fails with `NotFound(parent)` unless the parent of `path` is a directory.
    fn require_parent(&self, path: &Path) -> NamingResult<()> {
        let parent = path
            .parent()
            .map_err(|_| NamingError::NotFound(path.clone()))?;
        match self.tree.is_directory(&parent) {
            Some(true) => Ok(()),
            _ => Err(NamingError::NotFound(parent)),
        }
    }
}

/// The naming server's directory tree and storage server registry.
#[derive(Default)]
pub struct NamingService {
    state: Mutex<State>,
}

impl NamingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered storage servers.
    pub fn storage_servers(&self) -> usize {
        self.lock().registry.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Service for NamingService {
    fn is_directory(&self, path: &Path) -> NamingResult<bool> {
        self.lock()
            .tree
            .is_directory(path)
            .ok_or_else(|| NamingError::NotFound(path.clone()))
    }

    fn list(&self, directory: &Path) -> NamingResult<BTreeSet<String>> {
        let state = self.lock();
        match state.tree.is_directory(directory) {
            Some(true) => Ok(state.tree.children(directory)),
            _ => Err(NamingError::NotFound(directory.clone())),
        }
    }

    fn create_file(&self, path: &Path) -> NamingResult<bool> {
        if path.is_root() {
            return Ok(false);
        }

        let mut state = self.lock();
        state.require_parent(path)?;
        if state.tree.exists(path) {
            return Ok(false);
        }

        let owner = state.registry.next_server()?;
        match owner.command.create(path) {
            Ok(created) => {
                if !created {
                    tracing::warn!("{} already held {} locally", owner, path);
                }
            }
            Err(e) => {
                tracing::warn!("failed to create {} on {}: {}", path, owner, e);
                return Err(NamingError::StorageUnavailable(format!("{owner}: {e}")));
            }
        }

        tracing::debug!("created file {} on {}", path, owner);
        state.tree.insert(path.clone(), Node::file(owner));
        Ok(true)
    }

    fn create_directory(&self, path: &Path) -> NamingResult<bool> {
        if path.is_root() {
            return Ok(false);
        }

        let mut state = self.lock();
        state.require_parent(path)?;
        if state.tree.exists(path) {
            return Ok(false);
        }

        tracing::debug!("created directory {}", path);
        state.tree.insert(path.clone(), Node::directory(None));
        Ok(true)
    }

    fn delete(&self, path: &Path) -> NamingResult<bool> {
        if path.is_root() {
            return Ok(false);
        }

        let mut state = self.lock();
        state.require_parent(path)?;
        if !state.tree.exists(path) {
            return Err(NamingError::NotFound(path.clone()));
        }

        let removed = state.tree.remove_subtree(path);
        let mut holders: Vec<&Owner> = Vec::new();
        for owner in removed
            .iter()
            .filter(|(_, node)| node.is_file())
            .filter_map(|(_, node)| node.owner())
        {
            if !holders.contains(&owner) {
                holders.push(owner);
            }
        }

        for owner in holders {
            match owner.command.delete(path) {
                Ok(true) => tracing::debug!("deleted {} on {}", path, owner),
                Ok(false) => tracing::warn!("{} did not hold {} locally", owner, path),
                Err(e) => tracing::warn!("failed to delete {} on {}: {}", path, owner, e),
            }
        }

        Ok(true)
    }

    fn get_storage(&self, path: &Path) -> NamingResult<StorageStub> {
        let state = self.lock();
        match state.tree.get(path) {
            Some(node) if node.is_file() => node
                .owner()
                .map(|owner| owner.storage.clone())
                .ok_or_else(|| NamingError::NotFound(path.clone())),
            _ => Err(NamingError::NotFound(path.clone())),
        }
    }
}

impl Registration for NamingService {
    fn register(
        &self,
        storage: &StorageStub,
        command: &CommandStub,
        paths: &[Path],
    ) -> NamingResult<Vec<Path>> {
        let owner = Owner {
            storage: storage.clone(),
            command: command.clone(),
        };

        let mut state = self.lock();
        state.registry.admit(&owner)?;
        let duplicates = registration::merge(&mut state.tree, &owner, paths);

        tracing::info!(
            "registered storage server {} with {} files ({} duplicates)",
            owner,
            paths.len() - duplicates.len(),
            duplicates.len()
        );
        Ok(duplicates)
    }
}
