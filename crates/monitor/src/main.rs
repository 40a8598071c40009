//! Drowsywatch - Main Entry Point

use anyhow::Context;
use monitor::{init_logging, run, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== Drowsywatch v{} ===", env!("CARGO_PKG_VERSION"));

    // Optional first argument: configuration file
    let config_path = std::env::args().nth(1);
    let config = AppConfig::load(config_path.as_deref()).context("failed to load configuration")?;
    config.validate()?;

    run(config).await.context("monitoring stopped with an error")?;

    info!("Monitoring finished");
    Ok(())
}
