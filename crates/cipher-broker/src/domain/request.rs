//! Encryption requests and their worker command line.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Operation requested from the worker via `--mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum WorkerMode {
    /// Encrypt the supplied data with a key derived from the password
    Encrypt,
}

impl WorkerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerMode::Encrypt => "encrypt",
        }
    }
}

impl fmt::Display for WorkerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single unit of work for the external worker.
///
/// Built per HTTP call and consumed by exactly one invocation.
#[derive(Clone)]
pub struct EncryptionRequest {
    pub mode: WorkerMode,
    /// Arbitrary JSON handed to the worker as `--data`
    pub payload: Value,
    pub password: String,
}

impl EncryptionRequest {
    pub fn new(mode: WorkerMode, payload: Value, password: impl Into<String>) -> Self {
        Self {
            mode,
            payload,
            password: password.into(),
        }
    }

    /// Shorthand for an `encrypt` request
    pub fn encrypt(payload: Value, password: impl Into<String>) -> Self {
        Self::new(WorkerMode::Encrypt, payload, password)
    }

    /// Worker arguments: `--mode <mode> --data <json> --password <password>`
    pub fn to_arguments(&self) -> Vec<String> {
        vec![
            "--mode".to_string(),
            self.mode.as_str().to_string(),
            "--data".to_string(),
            self.payload.to_string(),
            "--password".to_string(),
            self.password.clone(),
        ]
    }
}

impl fmt::Debug for EncryptionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionRequest")
            .field("mode", &self.mode)
            .field("payload", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}
