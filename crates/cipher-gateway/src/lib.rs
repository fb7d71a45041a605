//! Cipher Gateway - HTTP front end for the encryption broker.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     CIPHER GATEWAY                         │
//! ├───────────────────────────────────────────────────────────┤
//! │  POST /encrypt        POST /chat/encrypt                   │
//! │  GET  /health         GET  /metrics                        │
//! │         │                    │                             │
//! │  ┌──────┴────────────────────┴──────┐                      │
//! │  │  CORS → Tracing → BodyLimit → Auth │                     │
//! │  └──────────────────┬───────────────┘                      │
//! │                     │                                      │
//! │   WorkerInvoker / SelectiveEncryptionPolicy (cipher-broker) │
//! └─────────────────────┼─────────────────────────────────────┘
//!                       │
//!               external worker process
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use cipher_gateway::{CipherGatewayService, GatewayConfig};
//!
//! let config = GatewayConfig::from_env()?;
//! let service = CipherGatewayService::new(config)?;
//! service.start().await?;
//! ```
//!
//! # Error responses
//!
//! | Outcome | Status | Body |
//! |---------|--------|------|
//! | worker exited non-zero | 500 | `{error: "Encryption failed", details}` |
//! | stdout not JSON | 500 | `{error: "Failed to parse encryption result", rawOutput, parseError}` |
//! | worker could not start | 500 | `{error: "Encryption failed"}` |
//! | worker timed out | 504 | `{error: "Encryption worker timed out", timeoutMs}` |
//! | missing/wrong API key | 401 | `{error: "Unauthorized"}` |

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod handlers;
pub mod middleware;
pub mod service;

pub use domain::{ApiError, ConfigError, GatewayConfig, GatewayError};
pub use handlers::AppState;
pub use service::CipherGatewayService;
