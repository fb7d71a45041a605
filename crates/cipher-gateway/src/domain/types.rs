//! Request and response bodies.

use cipher_broker::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// `POST /encrypt` body
#[derive(Clone, Deserialize)]
pub struct EncryptRequest {
    /// Any JSON value; handed to the worker as JSON text
    pub data: Value,
    pub password: String,
}

impl fmt::Debug for EncryptRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptRequest")
            .field("data", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `POST /chat/encrypt` body
#[derive(Clone, Deserialize)]
pub struct ChatEncryptRequest {
    pub messages: Vec<Message>,
    pub password: String,
}

impl fmt::Debug for ChatEncryptRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatEncryptRequest")
            .field("messages", &self.messages.len())
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `POST /chat/encrypt` success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEncryptResponse {
    pub messages: Vec<Message>,
}

/// `GET /health` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
