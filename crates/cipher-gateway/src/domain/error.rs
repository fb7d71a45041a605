//! HTTP error bodies and gateway-level errors.
//!
//! Every failure body carries an `error` string. Worker output appears only
//! under `details` (stderr) or `rawOutput` (stdout); OS-level spawn errors
//! are logged and never returned to the client.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cipher_broker::{PolicyError, WorkerFailure};
use serde_json::{Map, Value};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use super::config::ConfigError;

/// Client-facing error messages
pub mod messages {
    pub const ENCRYPTION_FAILED: &str = "Encryption failed";
    pub const PARSE_FAILED: &str = "Failed to parse encryption result";
    pub const TIMED_OUT: &str = "Encryption worker timed out";
    pub const UNAUTHORIZED: &str = "Unauthorized";
}

/// An HTTP error response: status plus a JSON object with an `error` field
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Response status
    pub status: StatusCode,
    /// Value of the `error` field
    pub message: String,
    /// Additional top-level fields
    pub fields: Map<String, Value>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: Map::new(),
        }
    }

    /// Add a top-level field to the body
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// 500 `Encryption failed`, optionally with worker diagnostics
    pub fn encryption_failed(details: Option<String>) -> Self {
        let error = Self::new(StatusCode::INTERNAL_SERVER_ERROR, messages::ENCRYPTION_FAILED);
        match details {
            Some(details) => error.with_field("details", details),
            None => error,
        }
    }

    /// 500 with the worker's undecodable stdout
    pub fn parse_failed(raw_output: impl Into<String>, parse_error: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, messages::PARSE_FAILED)
            .with_field("rawOutput", raw_output.into())
            .with_field("parseError", parse_error.into())
    }

    /// 504 when the worker outlived its deadline
    pub fn timed_out(after: Duration) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, messages::TIMED_OUT)
            .with_field("timeoutMs", after.as_millis() as u64)
    }

    /// 401 for a missing or wrong API key
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, messages::UNAUTHORIZED)
    }

    /// The JSON body
    pub fn body(&self) -> Value {
        let mut body = Map::with_capacity(self.fields.len() + 1);
        body.insert("error".to_string(), Value::String(self.message.clone()));
        for (key, value) in &self.fields {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let mut response = (status, Json(self.body())).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<WorkerFailure> for ApiError {
    fn from(failure: WorkerFailure) -> Self {
        match failure {
            WorkerFailure::Worker { stderr, .. } => ApiError::encryption_failed(Some(stderr)),
            WorkerFailure::Decode {
                raw_stdout,
                parse_error,
            } => ApiError::parse_failed(raw_stdout, parse_error),
            WorkerFailure::Timeout { after } => ApiError::timed_out(after),
            // spawn errors, stream errors, oversized output, shutdown and
            // cancellation carry nothing the client should see
            _ => ApiError::encryption_failed(None),
        }
    }
}

impl From<PolicyError> for ApiError {
    fn from(error: PolicyError) -> Self {
        match error {
            PolicyError::Worker { source, .. } => source.into(),
            PolicyError::Rejected { reason, .. } => ApiError::encryption_failed(Some(reason)),
            PolicyError::MissingCiphertext { raw, .. } => {
                ApiError::parse_failed(raw.to_string(), "worker result carries no ciphertext")
            }
        }
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Gateway-level errors (startup and serving)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server socket bind error
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl From<cipher_broker::ConfigError> for GatewayError {
    fn from(error: cipher_broker::ConfigError) -> Self {
        GatewayError::Config(error.into())
    }
}
