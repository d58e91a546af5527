//! # DFS API
//!
//! Remote interface definitions shared by every process in the filesystem.
//!
//! Contains:
//! - [`Service`]: client-facing naming operations on the directory tree
//! - [`Registration`]: how storage servers announce themselves to the naming server
//! - [`Storage`]: client-facing file data access on a storage server
//! - [`Command`]: naming server control of a storage server's local files
//! - The application error types those interfaces raise
//! - [`ServerHooks`], the lifecycle hooks every server process installs on its skeletons
//!
//! Each interface comes with a marker type implementing [`dfs_rmi::RemoteInterface`]
//! and an implementation of its trait for the matching [`dfs_rmi::Stub`], so a stub can
//! be used anywhere a local implementation can.
//!
//! Used by `dfs-naming`, `dfs-storage` and `dfs-cli`.

mod command;
mod error;
mod lifecycle;
mod registration;
mod service;
mod storage;

pub use command::{Command, CommandApi, CommandStub};
pub use error::{NamingError, NamingResult, StorageError, StorageResult};
pub use lifecycle::ServerHooks;
pub use registration::{Registration, RegistrationApi, RegistrationStub};
pub use service::{Service, ServiceApi, ServiceStub};
pub use storage::{Storage, StorageApi, StorageStub};

/// Default port of the naming server's client-facing service.
pub const SERVICE_PORT: u16 = 6000;

/// Default port of the naming server's registration service.
pub const REGISTRATION_PORT: u16 = 6001;
