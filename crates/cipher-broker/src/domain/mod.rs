//! Domain types for the encryption broker.
//!
//! Pure data and classification logic; no process handling lives here.

pub mod config;
pub mod error;
pub mod invocation;
pub mod message;
pub mod request;

// Re-exports for convenience
pub use config::{BrokerConfig, ConfigError};
pub use error::{FailureKind, WorkerFailure, WorkerResult};
pub use invocation::WorkerInvocation;
pub use message::Message;
pub use request::{EncryptionRequest, WorkerMode};
