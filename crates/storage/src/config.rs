//! Storage server configuration.

use dfs_api::{RegistrationStub, REGISTRATION_PORT};
use dfs_common::config::{self, ConfigResult};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Local directory holding the server's files (required).
pub const ROOT_VAR: &str = "DFS_STORAGE_ROOT";

/// Hostname advertised to the naming server and, through it, to clients.
pub const HOSTNAME_VAR: &str = "DFS_STORAGE_HOSTNAME";

/// Host running the naming server.
pub const NAMING_HOST_VAR: &str = "DFS_NAMING_HOST";

/// Port of the naming server's registration service.
pub const REGISTRATION_PORT_VAR: &str = "DFS_REGISTRATION_PORT";

/// Fixed address for the storage service; the system picks a port if unset.
pub const STORAGE_ADDR_VAR: &str = "DFS_STORAGE_ADDR";

/// Fixed address for the command service; the system picks a port if unset.
pub const COMMAND_ADDR_VAR: &str = "DFS_COMMAND_ADDR";

const DEFAULT_HOST: &str = "127.0.0.1";

/// Storage server configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
    hostname: String,
    naming_host: String,
    registration_port: u16,
    storage_addr: Option<SocketAddr>,
    command_addr: Option<SocketAddr>,
}

impl StorageConfig {
    /// Configuration for a server rooted at `root`, with every other setting defaulted.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            hostname: DEFAULT_HOST.to_owned(),
            naming_host: DEFAULT_HOST.to_owned(),
            registration_port: REGISTRATION_PORT,
            storage_addr: None,
            command_addr: None,
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_naming(mut self, host: impl Into<String>, registration_port: u16) -> Self {
        self.naming_host = host.into();
        self.registration_port = registration_port;
        self
    }

    pub fn with_addresses(
        mut self,
        storage_addr: Option<SocketAddr>,
        command_addr: Option<SocketAddr>,
    ) -> Self {
        self.storage_addr = storage_addr;
        self.command_addr = command_addr;
        self
    }

    /// Resolves configuration from raw variable values.
    ///
    /// # Arguments
    ///
    /// Each argument is the value of the correspondingly named `DFS_*` variable.
    ///
    /// # Errors
    ///
    /// Returns [`dfs_common::ConfigError::Missing`] if no root is given and
    /// [`dfs_common::ConfigError::Invalid`] if a port or address does not parse.
    pub fn resolve(
        root: Option<String>,
        hostname: Option<String>,
        naming_host: Option<String>,
        registration_port: Option<String>,
        storage_addr: Option<String>,
        command_addr: Option<String>,
    ) -> ConfigResult<Self> {
        let root: PathBuf = config::parse_required(ROOT_VAR, root)?;

        Ok(Self::new(root)
            .with_hostname(hostname.unwrap_or_else(|| DEFAULT_HOST.to_owned()))
            .with_naming(
                naming_host.unwrap_or_else(|| DEFAULT_HOST.to_owned()),
                config::parse_or(REGISTRATION_PORT_VAR, registration_port, REGISTRATION_PORT)?,
            )
            .with_addresses(
                config::parse_opt(STORAGE_ADDR_VAR, storage_addr)?,
                config::parse_opt(COMMAND_ADDR_VAR, command_addr)?,
            ))
    }

    /// Resolves configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`StorageConfig::resolve`].
    pub fn from_env() -> ConfigResult<Self> {
        Self::resolve(
            config::var(ROOT_VAR),
            config::var(HOSTNAME_VAR),
            config::var(NAMING_HOST_VAR),
            config::var(REGISTRATION_PORT_VAR),
            config::var(STORAGE_ADDR_VAR),
            config::var(COMMAND_ADDR_VAR),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn storage_addr(&self) -> Option<SocketAddr> {
        self.storage_addr
    }

    pub fn command_addr(&self) -> Option<SocketAddr> {
        self.command_addr
    }

    /// Stub for the naming server's registration service.
    pub fn registration_stub(&self) -> RegistrationStub {
        RegistrationStub::new(self.naming_host.clone(), self.registration_port)
    }
}
