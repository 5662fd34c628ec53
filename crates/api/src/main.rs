//! FreightWatch - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_logging(&config.log);

    info!("=== FreightWatch v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Monitoring with {} geofence(s), {} hotspot(s)",
        config.geofences.len(),
        config.hotspots.len()
    );

    run_server(config).await
}
