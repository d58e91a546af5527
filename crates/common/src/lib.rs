//! # DFS Common
//!
//! Value types shared by every process in the distributed filesystem.
//!
//! Contains:
//! - [`Path`], the validated, immutable filesystem path used by all remote interfaces
//! - Helpers mapping paths onto a storage server's local directory
//! - Environment variable parsing for process configuration ([`config`])
//!
//! **No transport concerns**: stubs, skeletons and wire framing belong in `dfs-rmi`.

pub mod config;
mod path;

pub use config::{ConfigError, ConfigResult};
pub use path::{Path, RESERVED, SEPARATOR};

/// Errors raised while constructing or resolving a [`Path`].
///
/// These are validation errors: they are always raised locally and never travel across
/// the wire.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// The path string did not begin with the separator
    #[error("path must begin with '/': '{0}'")]
    NotAbsolute(String),

    /// The path string contained the reserved delimiter
    #[error("path must not contain ':': '{0}'")]
    ReservedCharacter(String),

    /// A single component was empty or contained a separator or delimiter
    #[error("invalid path component: '{0}'")]
    InvalidComponent(String),

    /// A component was `.` or `..`
    #[error("path must not contain '.' or '..' components: '{0}'")]
    RelativeComponent(String),

    /// The operation has no meaning for the root directory
    #[error("the root directory has no parent or last component")]
    Root,

    /// The local directory to list does not exist
    #[error("directory does not exist: {0}")]
    DirectoryNotFound(std::path::PathBuf),

    /// The local path to list exists but is not a directory
    #[error("not a directory: {0}")]
    NotADirectory(std::path::PathBuf),

    /// I/O error while walking a local directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for path operations.
pub type PathResult<T> = Result<T, PathError>;
