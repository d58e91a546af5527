use dfs_common::Path;
use dfs_rmi::RmiError;
use serde::{Deserialize, Serialize};

/// Errors raised by the naming server's interfaces.
///
/// Every variant except `Rmi` travels over the wire and is re-raised at the caller.
#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
pub enum NamingError {
    /// The path, or the directory it should live in, does not exist
    #[error("path not found: {0}")]
    NotFound(Path),

    /// The storage server's command stub has registered before
    #[error("storage server is already registered")]
    AlreadyRegistered,

    /// A file cannot be placed because no storage server has registered
    #[error("no storage servers are registered")]
    NoStorageServers,

    /// The storage server chosen for a file could not be commanded
    #[error("storage server unavailable: {0}")]
    StorageUnavailable(String),

    /// The call did not reach the naming server or its reply did not come back
    #[error(transparent)]
    #[serde(skip)]
    Rmi(#[from] RmiError),
}

/// Errors raised by a storage server's interfaces.
#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
pub enum StorageError {
    /// The path does not name a file on this server
    #[error("file not found: {0}")]
    NotFound(Path),

    /// A read extends past the end of the file
    #[error("read of {length} bytes at offset {offset} is out of bounds for {path} ({size} bytes)")]
    OutOfBounds {
        path: Path,
        offset: u64,
        length: u64,
        size: u64,
    },

    /// The local filesystem failed
    #[error("storage I/O failed: {0}")]
    Io(String),

    /// The call did not reach the storage server or its reply did not come back
    #[error(transparent)]
    #[serde(skip)]
    Rmi(#[from] RmiError),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        StorageError::Io(error.to_string())
    }
}

/// Result type for naming operations.
pub type NamingResult<T> = Result<T, NamingError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
