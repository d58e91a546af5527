//! # DFS Storage
//!
//! Storage servers of the distributed filesystem.
//!
//! Handles:
//! - Reading, writing and sizing files under a local root directory ([`StorageService`])
//! - Creating and deleting files on the naming server's command
//! - Registering with the naming server and discarding duplicate files ([`StorageServer`])
//!
//! A storage server holds no directory metadata of its own: the local directory layout
//! mirrors the distributed paths of the files it stores.

#![warn(rust_2018_idioms)]

mod config;
mod server;
mod service;

pub use config::{
    StorageConfig, COMMAND_ADDR_VAR, HOSTNAME_VAR, NAMING_HOST_VAR, REGISTRATION_PORT_VAR,
    ROOT_VAR, STORAGE_ADDR_VAR,
};
pub use server::StorageServer;
pub use service::StorageService;

use dfs_api::{NamingError, StorageError};
use dfs_rmi::RmiError;
use std::path::PathBuf;

/// Errors that prevent a storage server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The configured root does not exist or is not a directory
    #[error("storage root is not a directory: {}", .0.display())]
    RootNotFound(PathBuf),

    /// A skeleton could not be started or addressed
    #[error(transparent)]
    Rmi(#[from] RmiError),

    /// The naming server rejected the registration or could not be reached
    #[error("registration failed: {0}")]
    Registration(#[from] NamingError),

    /// The local files could not be listed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for storage server lifecycle operations.
pub type ServerResult<T> = Result<T, ServerError>;
