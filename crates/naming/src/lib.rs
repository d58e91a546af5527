//! # DFS Naming
//!
//! The naming server of the distributed filesystem.
//!
//! Handles:
//! - The directory tree mapping every path to a file or directory ([`DirectoryTree`])
//! - Storage server registration and duplicate detection
//! - The client-facing [`dfs_api::Service`] operations ([`NamingService`])
//! - Serving both interfaces over the network ([`NamingServer`])
//!
//! The naming server never touches file contents. Clients ask it where a file lives and
//! then talk to that storage server directly.

#![warn(rust_2018_idioms)]

mod config;
mod registration;
mod server;
mod service;
mod tree;

pub use config::{NamingConfig, REGISTRATION_ADDR_VAR, SERVICE_ADDR_VAR};
pub use registration::{Owner, Registry};
pub use server::NamingServer;
pub use service::NamingService;
pub use tree::{DirectoryTree, Node};
