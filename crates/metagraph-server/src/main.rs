//! Metagraph Server - type service.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metagraph_server::{Args, TypeService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metagraph_server=info,metagraph_types=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting metagraph server");

    // Parse command-line arguments
    let args = Args::parse();
    let config = args.into_config();

    tracing::info!(
        data_path = %config.data_path.display(),
        bootstrap_files = config.bootstrap_files.len(),
        app_port = config.app_port,
        ha_enabled = config.ha.is_ha_enabled(),
        "configuration loaded"
    );

    // Resolve HA identity; the type service itself never consults it.
    if config.ha.is_ha_enabled() {
        let server_id = config.ha.server_id(config.app_port)?;
        tracing::info!(
            server_id = %server_id,
            address = ?config.ha.bound_address(&server_id),
            zookeeper = ?config.ha.zookeeper.connect_string,
            "HA identity resolved"
        );
    }

    let service = TypeService::start(&config)?;
    let registry = service.registry();
    tracing::info!(
        version = registry.version(),
        types = registry.type_names().len(),
        enums = registry.enum_names().len(),
        "type service ready"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl+c");
    }
    tracing::info!("received shutdown signal");

    service.flush()?;
    tracing::info!("server shutdown complete");

    Ok(())
}
