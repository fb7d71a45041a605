//! Cipher gateway binary.
//!
//! Configuration: `CIPHER_GATEWAY_CONFIG` names an optional TOML file;
//! `CIPHER_*` variables override individual values. Logging is controlled by
//! `CIPHER_LOG_LEVEL` / `RUST_LOG` and `CIPHER_JSON_LOGS`.

use std::sync::Arc;

use anyhow::{Context, Result};
use cipher_gateway::{CipherGatewayService, GatewayConfig};
use cipher_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("failed to initialize telemetry")?;

    let config = GatewayConfig::from_env().context("failed to load configuration")?;
    let service = Arc::new(CipherGatewayService::new(config)?);

    let signal_target = Arc::clone(&service);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Received Ctrl+C, shutting down");
        signal_target.shutdown();
    });

    service.start().await?;
    Ok(())
}
