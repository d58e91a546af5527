use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dfs_naming::{NamingConfig, NamingServer};

/// Main entry point for the distributed filesystem naming server
///
/// Starts the naming server's two services and blocks until either stops:
/// - client service on port 6000 (configurable via DFS_SERVICE_ADDR)
/// - registration service on port 6001 (configurable via DFS_REGISTRATION_ADDR)
///
/// Storage servers and clients are run with the `dfs` binary.
///
/// # Environment Variables
/// - `DFS_SERVICE_ADDR`: client service address (default: "0.0.0.0:6000")
/// - `DFS_REGISTRATION_ADDR`: registration service address (default: "0.0.0.0:6001")
/// - `RUST_LOG`: log filter, added to the default `dfs=info`
///
/// # Returns
/// * `Ok(())` - If the server started and later stopped
/// * `Err(anyhow::Error)` - If configuration is invalid or a service fails to start
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("dfs=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = NamingConfig::from_env()?;

    tracing::info!("++ Starting DFS naming service on {}", config.service_addr());
    tracing::info!("++ Starting DFS registration on {}", config.registration_addr());

    let server = NamingServer::new(&config);
    server.start()?;
    server.wait();

    Ok(())
}
