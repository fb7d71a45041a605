//! # Cipher Telemetry
//!
//! Structured logging for the cipher gateway, built on `tracing-subscriber`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cipher_telemetry::{TelemetryConfig, init_telemetry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(config).expect("Failed to init telemetry");
//!
//!     // Your application code here
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CIPHER_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `CIPHER_JSON_LOGS` | `false` | JSON lines instead of pretty output |
//! | `CIPHER_CONSOLE_OUTPUT` | `true` | Write events to stdout at all |
//! | `CIPHER_SERVICE_NAME` | `cipher-gateway` | Service name in the startup event |

mod config;
mod subscriber;

pub use config::TelemetryConfig;
pub use subscriber::build_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Install the global subscriber described by `config`.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    subscriber::init_subscriber(&config)?;

    tracing::info!(
        service = %config.service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry...");
    }
}
