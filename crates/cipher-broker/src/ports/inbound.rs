//! Inbound Ports (Driving Ports)
//!
//! The API callers use to run encryption work on an external worker.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{EncryptionRequest, WorkerResult};

/// Runs one external worker per call (Driving Port)
///
/// Implementations must not decode output before the process has exited and
/// both of its output streams are drained, and must kill the process when
/// `cancel` fires.
#[async_trait]
pub trait WorkerInvoker: Send + Sync {
    /// Spawn the worker with `arguments` appended to the configured command
    /// line and resolve to its decoded stdout or a classified failure
    async fn invoke(&self, arguments: Vec<String>, cancel: CancellationToken) -> WorkerResult;

    /// Run a prepared [`EncryptionRequest`]
    async fn encrypt(&self, request: EncryptionRequest, cancel: CancellationToken) -> WorkerResult {
        self.invoke(request.to_arguments(), cancel).await
    }
}
