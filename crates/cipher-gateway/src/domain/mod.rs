//! Domain types for the cipher gateway.

pub mod config;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::{AuthConfig, ConfigError, CorsConfig, GatewayConfig, HttpConfig, LimitsConfig};
pub use error::{ApiError, ApiResult, GatewayError};
pub use types::{ChatEncryptRequest, ChatEncryptResponse, EncryptRequest, HealthResponse};
