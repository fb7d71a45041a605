//! Cipher Broker - subprocess-mediated encryption.
//!
//! Encryption itself happens in an external worker program. This crate starts
//! one worker process per request, hands it the request on the command line,
//! and turns whatever comes back into a typed result.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    CIPHER BROKER                          │
//! ├──────────────────────────────────────────────────────────┤
//! │  SelectiveEncryptionPolicy   (service)                    │
//! │        │  one request per sensitive message               │
//! │        ▼                                                  │
//! │  WorkerInvoker               (port)                       │
//! │        │                                                  │
//! │        ▼                                                  │
//! │  ProcessWorker               (adapter)                    │
//! │    permit → spawn → drain stdout/stderr → wait → decode   │
//! └──────────────────────────────────────────────────────────┘
//!                         │
//!                 worker --mode encrypt --data <json> --password <pw>
//! ```
//!
//! # Outcome classification
//!
//! - non-zero exit or death by signal: [`WorkerFailure::Worker`] with stderr
//! - clean exit with unparseable stdout: [`WorkerFailure::Decode`] with raw stdout
//! - clean exit with JSON stdout: the decoded value
//!
//! A worker that outlives the configured timeout, or whose caller cancels,
//! is killed and reaped.
//!
//! # Usage
//!
//! ```ignore
//! use cipher_broker::{BrokerConfig, ProcessWorker, SelectiveEncryptionPolicy};
//!
//! let worker = Arc::new(ProcessWorker::new(BrokerConfig::default())?);
//! let policy = SelectiveEncryptionPolicy::new(worker);
//! let encrypted = policy.apply(messages, "password", &CancellationToken::new()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::ProcessWorker;
pub use domain::{
    BrokerConfig, ConfigError, EncryptionRequest, FailureKind, Message, WorkerFailure,
    WorkerInvocation, WorkerMode, WorkerResult,
};
pub use metrics::BrokerStats;
pub use ports::WorkerInvoker;
pub use service::{PolicyError, SelectiveEncryptionPolicy};
pub use tokio_util::sync::CancellationToken;
