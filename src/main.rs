//! # Tenant Groups Gateway - Main Entry Point
//!
//! Loads configuration, builds the shared tenant group cache once and serves
//! the enrich-and-forward gateway until Ctrl-C.
//!
//! Logging is initialized from the environment before configuration is
//! loaded so that configuration warnings are visible.

use std::sync::Arc;
use tracing::{error, info};

use tenant_groups_gateway::observability::{self, metrics};
use tenant_groups_gateway::{CacheSettings, GatewayConfig, GatewayResult, GatewayServer, GraphDirectoryResolver, TenantGroupCache};

#[tokio::main]
async fn main() -> GatewayResult<()> {
    observability::init_from_env()?;

    info!("Starting tenant groups gateway");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        error!("Failed to run gateway: {}", e);
        std::process::exit(1);
    }

    info!("Gateway shutdown complete");
    Ok(())
}

async fn run() -> GatewayResult<()> {
    let config = GatewayConfig::load().await?;
    info!(
        bind_address = %config.server.bind_address,
        upstream = config.server.upstream_url.as_deref().unwrap_or(""),
        refresh_interval_minutes = config.directory.refresh_interval_minutes,
        group_transform_disabled = config.auth.group_transform_disabled,
        "Configuration loaded"
    );

    if let Some(address) = config.observability.metrics_address {
        metrics::install_prometheus_exporter(address)?;
    }
    metrics::describe_metrics();

    let resolver = GraphDirectoryResolver::from_config(&config.directory)?;
    let cache = Arc::new(TenantGroupCache::new(
        Arc::new(resolver),
        CacheSettings::from_config(&config.directory),
    ));

    let server = GatewayServer::new(&config, cache)?;
    info!("Gateway ready on {}", server.bind_addr());
    server.start().await
}
