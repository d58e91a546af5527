use crate::{ServerError, ServerResult, StorageConfig, StorageService};
use dfs_api::{
    Command, CommandApi, CommandStub, Registration, ServerHooks, Storage, StorageApi,
    StorageStub,
};
use dfs_rmi::{RmiResult, Skeleton, Stub};
use std::sync::Arc;

/// A storage server process: one [`StorageService`] exposed through two skeletons.
///
/// Clients use the storage interface to read and write file data. The naming server uses
/// the command interface to create and delete files.
pub struct StorageServer {
    service: Arc<StorageService>,
    hooks: Arc<ServerHooks>,
    storage_skeleton: Skeleton<StorageApi>,
    command_skeleton: Skeleton<CommandApi>,
}

impl StorageServer {
    pub fn new(config: &StorageConfig) -> Self {
        let service = Arc::new(StorageService::new(config.root()));
        let hooks = Arc::new(ServerHooks::new("storage"));

        let storage_target = Arc::clone(&service) as Arc<dyn Storage>;
        let storage_skeleton = match config.storage_addr() {
            Some(addr) => Skeleton::<StorageApi>::with_address(storage_target, addr),
            None => Skeleton::<StorageApi>::new(storage_target),
        }
        .with_hooks(hooks.clone());

        let command_target = Arc::clone(&service) as Arc<dyn Command>;
        let command_skeleton = match config.command_addr() {
            Some(addr) => Skeleton::<CommandApi>::with_address(command_target, addr),
            None => Skeleton::<CommandApi>::new(command_target),
        }
        .with_hooks(hooks.clone());

        Self {
            service,
            hooks,
            storage_skeleton,
            command_skeleton,
        }
    }

    /// Starts the server and registers it with the naming server.
    ///
    /// Once registered, every file the naming server reports as a duplicate is deleted
    /// locally, along with any directories left empty by that.
    ///
    /// # Arguments
    ///
    /// * `hostname` - Name or address clients can reach this machine at
    /// * `naming` - The naming server's registration service
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::RootNotFound`] if the root directory is missing,
    /// [`ServerError::Rmi`] if a skeleton fails to start, and
    /// [`ServerError::Registration`] if the naming server refuses or cannot be reached.
    /// Nothing is left running on error.
    pub fn start(&self, hostname: &str, naming: &dyn Registration) -> ServerResult<()> {
        if self.is_running() {
            return Err(ServerError::Rmi(dfs_rmi::RmiError::AlreadyRunning));
        }
        let root = self.service.root();
        if !root.is_dir() {
            return Err(ServerError::RootNotFound(root.to_path_buf()));
        }

        tracing::info!("-- Starting storage server for {}", root.display());
        self.hooks.started();

        if let Err(e) = self.start_and_register(hostname, naming) {
            self.stop();
            return Err(e);
        }
        Ok(())
    }

    fn start_and_register(&self, hostname: &str, naming: &dyn Registration) -> ServerResult<()> {
        self.storage_skeleton.start()?;
        self.command_skeleton.start()?;

        let storage = Stub::with_hostname(&self.storage_skeleton, hostname)?;
        let command = Stub::with_hostname(&self.command_skeleton, hostname)?;
        let files = self.service.files()?;

        let duplicates = naming.register(&storage, &command, &files)?;
        tracing::info!(
            "-- Registered {} with {} files, {} duplicates to remove",
            storage,
            files.len(),
            duplicates.len()
        );

        for path in &duplicates {
            match self.service.delete(path) {
                Ok(_) => tracing::debug!("removed duplicate {}", path),
                Err(e) => tracing::warn!("failed to remove duplicate {}: {}", path, e),
            }
        }
        Ok(())
    }

    /// Stops both skeletons.
    pub fn stop(&self) {
        self.storage_skeleton.stop();
        self.command_skeleton.stop();
    }

    /// Blocks until either skeleton stops.
    pub fn wait(&self) {
        self.hooks.wait();
    }

    pub fn is_running(&self) -> bool {
        self.storage_skeleton.is_running() && self.command_skeleton.is_running()
    }

    /// The local service behind both skeletons.
    pub fn service(&self) -> &Arc<StorageService> {
        &self.service
    }

    /// A stub for the storage interface, reachable from this machine.
    ///
    /// # Errors
    ///
    /// Returns [`dfs_rmi::RmiError::NoAddress`] if the server has not been started.
    pub fn storage_stub(&self) -> RmiResult<StorageStub> {
        Stub::from_skeleton(&self.storage_skeleton)
    }

    /// A stub for the command interface, reachable from this machine.
    ///
    /// # Errors
    ///
    /// See [`StorageServer::storage_stub`].
    pub fn command_stub(&self) -> RmiResult<CommandStub> {
        Stub::from_skeleton(&self.command_skeleton)
    }
}
