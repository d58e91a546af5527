use anyhow::Context;
use clap::{Parser, Subcommand};
use dfs_api::{Service, ServiceStub, REGISTRATION_PORT, SERVICE_PORT};
use dfs_common::config::{self, ConfigResult};
use dfs_common::Path;
use dfs_naming::{NamingConfig, NamingServer};
use dfs_storage::{StorageConfig, StorageServer, COMMAND_ADDR_VAR, STORAGE_ADDR_VAR};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod client;

#[derive(Parser)]
#[command(name = "dfs")]
#[command(about = "Distributed filesystem servers and client")]
struct Cli {
    /// Host running the naming server
    #[arg(long, global = true, default_value = "127.0.0.1")]
    naming_host: String,

    /// Port of the naming server's client service
    #[arg(long, global = true, default_value_t = SERVICE_PORT)]
    service_port: u16,

    /// Port of the naming server's registration service
    #[arg(long, global = true, default_value_t = REGISTRATION_PORT)]
    registration_port: u16,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a naming server (addresses from DFS_SERVICE_ADDR / DFS_REGISTRATION_ADDR)
    Naming,
    /// Run a storage server and register it with the naming server
    Storage {
        /// Local directory holding the server's files
        #[arg(long)]
        root: PathBuf,
        /// Hostname clients should use to reach this server
        #[arg(long, default_value = "127.0.0.1")]
        hostname: String,
    },
    /// List a directory
    Ls { path: Path },
    /// Show whether a path is a file or a directory
    Stat { path: Path },
    /// Create a directory
    Mkdir { path: Path },
    /// Create an empty file
    Touch { path: Path },
    /// Delete a file or directory
    Rm { path: Path },
    /// Show which storage server holds a file
    Where { path: Path },
    /// Print a file's contents
    Cat { path: Path },
    /// Upload a local file
    Put {
        /// Destination path
        path: Path,
        /// Local file to upload
        local: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("dfs=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let service = ServiceStub::new(cli.naming_host.clone(), cli.service_port);
    let mut out = io::stdout().lock();

    match cli.command {
        Some(Commands::Naming) => {
            let server = NamingServer::new(&NamingConfig::from_env()?);
            server.start().context("starting naming server")?;
            server.wait();
        }
        Some(Commands::Storage { root, hostname }) => {
            let config = storage_config(root, &hostname, &cli.naming_host, cli.registration_port)?;
            let server = StorageServer::new(&config);
            server
                .start(config.hostname(), &config.registration_stub())
                .context("starting storage server")?;
            server.wait();
        }
        Some(Commands::Ls { path }) => client::list(&service, &path, &mut out)?,
        Some(Commands::Stat { path }) => client::stat(&service, &path, &mut out)?,
        Some(Commands::Mkdir { path }) => {
            report(&mut out, &path, service.create_directory(&path)?, "created")?
        }
        Some(Commands::Touch { path }) => {
            report(&mut out, &path, service.create_file(&path)?, "created")?
        }
        Some(Commands::Rm { path }) => report(&mut out, &path, service.delete(&path)?, "deleted")?,
        Some(Commands::Where { path }) => client::locate(&service, &path, &mut out)?,
        Some(Commands::Cat { path }) => client::cat(&service, &path, &mut out)?,
        Some(Commands::Put { path, local }) => {
            let data = std::fs::read(&local)
                .with_context(|| format!("reading {}", local.display()))?;
            client::put(&service, &path, &data)?;
            writeln!(out, "{path}: wrote {} bytes", data.len())?;
        }
        None => {
            writeln!(out, "Use 'dfs --help' for commands")?;
        }
    }

    Ok(())
}

fn storage_config(
    root: PathBuf,
    hostname: &str,
    naming_host: &str,
    registration_port: u16,
) -> ConfigResult<StorageConfig> {
    Ok(StorageConfig::new(root)
        .with_hostname(hostname)
        .with_naming(naming_host, registration_port)
        .with_addresses(
            config::parse_opt(STORAGE_ADDR_VAR, config::var(STORAGE_ADDR_VAR))?,
            config::parse_opt(COMMAND_ADDR_VAR, config::var(COMMAND_ADDR_VAR))?,
        ))
}

fn report(out: &mut dyn Write, path: &Path, changed: bool, verb: &str) -> io::Result<()> {
    if changed {
        writeln!(out, "{path}: {verb}")
    } else {
        writeln!(out, "{path}: unchanged")
    }
}
