//! Naming server configuration.
//!
//! Resolved once at startup from the environment and passed to [`crate::NamingServer`].

use dfs_api::{REGISTRATION_PORT, SERVICE_PORT};
use dfs_common::config::{self, ConfigResult};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Address of the client-facing service.
pub const SERVICE_ADDR_VAR: &str = "DFS_SERVICE_ADDR";

/// Address of the registration service.
pub const REGISTRATION_ADDR_VAR: &str = "DFS_REGISTRATION_ADDR";

/// Naming server configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamingConfig {
    service_addr: SocketAddr,
    registration_addr: SocketAddr,
}

impl Default for NamingConfig {
    /// Both services on all interfaces at their well-known ports.
    fn default() -> Self {
        let any = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        Self::new(
            SocketAddr::new(any, SERVICE_PORT),
            SocketAddr::new(any, REGISTRATION_PORT),
        )
    }
}

impl NamingConfig {
    pub fn new(service_addr: SocketAddr, registration_addr: SocketAddr) -> Self {
        Self {
            service_addr,
            registration_addr,
        }
    }

    /// Resolves configuration from raw variable values, using defaults for absent ones.
    ///
    /// # Errors
    ///
    /// Returns [`dfs_common::ConfigError::Invalid`] if an address does not parse.
    pub fn resolve(
        service_addr: Option<String>,
        registration_addr: Option<String>,
    ) -> ConfigResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            service_addr: config::parse_or(SERVICE_ADDR_VAR, service_addr, defaults.service_addr)?,
            registration_addr: config::parse_or(
                REGISTRATION_ADDR_VAR,
                registration_addr,
                defaults.registration_addr,
            )?,
        })
    }

    /// Resolves configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`NamingConfig::resolve`].
    pub fn from_env() -> ConfigResult<Self> {
        Self::resolve(config::var(SERVICE_ADDR_VAR), config::var(REGISTRATION_ADDR_VAR))
    }

    pub fn service_addr(&self) -> SocketAddr {
        self.service_addr
    }

    pub fn registration_addr(&self) -> SocketAddr {
        self.registration_addr
    }
}
