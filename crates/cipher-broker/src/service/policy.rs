//! Selective encryption of conversations.
//!
//! Only messages flagged `sensitive` are sent to a worker; everything else is
//! passed through in place. Sensitive messages are encrypted concurrently and
//! written back by position, so the output order never depends on which
//! worker finished first.

use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::{EncryptionRequest, Message, WorkerFailure};
use crate::ports::WorkerInvoker;

/// Field of the worker result holding the ciphertext
pub const CIPHERTEXT_FIELD: &str = "ciphertext";

/// Why a conversation could not be encrypted.
///
/// Any error aborts the whole conversation; there is no partial result.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The worker invocation for message `index` failed
    #[error("message {index}: {source}")]
    Worker {
        index: usize,
        #[source]
        source: WorkerFailure,
    },

    /// The worker exited cleanly but reported an error in its JSON output
    #[error("message {index}: worker rejected the request: {reason}")]
    Rejected { index: usize, reason: String },

    /// The worker output has no usable ciphertext
    #[error("message {index}: worker result carries no ciphertext")]
    MissingCiphertext { index: usize, raw: Value },
}

impl PolicyError {
    /// Position of the message that failed
    pub fn index(&self) -> usize {
        match self {
            PolicyError::Worker { index, .. }
            | PolicyError::Rejected { index, .. }
            | PolicyError::MissingCiphertext { index, .. } => *index,
        }
    }
}

/// Encrypts the sensitive messages of a conversation
#[derive(Clone)]
pub struct SelectiveEncryptionPolicy {
    invoker: Arc<dyn WorkerInvoker>,
}

impl SelectiveEncryptionPolicy {
    pub fn new(invoker: Arc<dyn WorkerInvoker>) -> Self {
        Self { invoker }
    }

    /// Return `conversation` with every sensitive message's content replaced
    /// by ciphertext and `encrypted` set.
    ///
    /// Without sensitive messages the input is returned as is and no worker
    /// is started. On the first failure the remaining invocations are
    /// dropped, which kills their processes.
    pub async fn apply(
        &self,
        conversation: Vec<Message>,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Message>, PolicyError> {
        let sensitive = conversation.iter().filter(|m| m.sensitive).count();
        if sensitive == 0 {
            return Ok(conversation);
        }

        debug!(
            messages = conversation.len(),
            sensitive = sensitive,
            "Encrypting sensitive messages"
        );

        let jobs = conversation
            .into_iter()
            .enumerate()
            .map(|(index, message)| async move {
                if !message.sensitive {
                    return Ok(message);
                }
                self.encrypt_message(index, message, password, cancel.clone())
                    .await
            });

        try_join_all(jobs).await
    }

    async fn encrypt_message(
        &self,
        index: usize,
        mut message: Message,
        password: &str,
        cancel: CancellationToken,
    ) -> Result<Message, PolicyError> {
        let request = EncryptionRequest::encrypt(Value::String(message.content), password);
        let value = self
            .invoker
            .encrypt(request, cancel)
            .await
            .map_err(|source| PolicyError::Worker { index, source })?;

        message.content = extract_ciphertext(index, value)?;
        message.encrypted = true;
        Ok(message)
    }
}

/// Pull the ciphertext out of a decoded worker result.
///
/// A `ciphertext` string field or a bare string is used directly. Any other
/// object (such as an `{encrypted, iv, salt}` envelope) is kept whole as
/// compact JSON so nothing needed for decryption is lost.
pub fn extract_ciphertext(index: usize, value: Value) -> Result<String, PolicyError> {
    match value {
        Value::String(ciphertext) => Ok(ciphertext),
        Value::Object(fields) => {
            if let Some(Value::String(ciphertext)) = fields.get(CIPHERTEXT_FIELD) {
                return Ok(ciphertext.clone());
            }
            if let Some(reason) = in_band_error(&fields) {
                return Err(PolicyError::Rejected { index, reason });
            }
            Ok(Value::Object(fields).to_string())
        }
        raw => Err(PolicyError::MissingCiphertext { index, raw }),
    }
}

/// The worker prints `{"error": "..."}` and exits 0 when it fails internally
fn in_band_error(fields: &Map<String, Value>) -> Option<String> {
    if fields.contains_key(CIPHERTEXT_FIELD) || fields.contains_key("encrypted") {
        return None;
    }
    match fields.get("error")? {
        Value::String(reason) => Some(reason.clone()),
        other => Some(other.to_string()),
    }
}
