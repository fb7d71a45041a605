//! Worker failure taxonomy.
//!
//! Process-level failures (could not start, non-zero exit, deadline) and
//! payload-level failures (exit 0 but unusable stdout) are separate variants
//! so callers never have to guess which axis failed.

use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result of one worker invocation
pub type WorkerResult = Result<Value, WorkerFailure>;

/// Why an invocation did not produce a decoded value
#[derive(Debug, Error)]
pub enum WorkerFailure {
    /// The executable could not be started (missing, not executable, ...)
    #[error("failed to spawn worker: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    /// The worker ran and reported failure via its exit status.
    /// `exit_code` is `None` when the process was terminated by a signal.
    #[error("worker exited with status {exit_code:?}: {stderr}")]
    Worker {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Exit status was 0 but stdout is not a JSON document
    #[error("failed to decode worker output: {parse_error}")]
    Decode {
        raw_stdout: String,
        parse_error: String,
    },

    /// The worker was still running at the deadline and has been killed
    #[error("worker timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// stdout grew beyond the configured cap
    #[error("worker output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    /// Reading the worker's pipes or reaping it failed mid-flight
    #[error("worker stream error: {source}")]
    Stream {
        #[source]
        source: std::io::Error,
    },

    /// The caller went away; the worker has been killed
    #[error("invocation cancelled")]
    Cancelled,

    /// The invocation pool has been shut down
    #[error("worker pool closed")]
    PoolClosed,
}

impl WorkerFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            WorkerFailure::Spawn { .. } => FailureKind::Spawn,
            WorkerFailure::Worker { .. } => FailureKind::Worker,
            WorkerFailure::Decode { .. } => FailureKind::Decode,
            WorkerFailure::Timeout { .. } => FailureKind::Timeout,
            WorkerFailure::OutputTooLarge { .. } => FailureKind::OutputTooLarge,
            WorkerFailure::Stream { .. } => FailureKind::Stream,
            WorkerFailure::Cancelled => FailureKind::Cancelled,
            WorkerFailure::PoolClosed => FailureKind::PoolClosed,
        }
    }

    /// Build a decode failure from raw stdout and the JSON error
    pub fn decode(raw_stdout: impl Into<String>, error: &serde_json::Error) -> Self {
        WorkerFailure::Decode {
            raw_stdout: raw_stdout.into(),
            parse_error: error.to_string(),
        }
    }
}

/// Failure classification without the payload, used for logs and counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Spawn,
    Worker,
    Decode,
    Timeout,
    OutputTooLarge,
    Stream,
    Cancelled,
    PoolClosed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Spawn => "spawn",
            FailureKind::Worker => "worker",
            FailureKind::Decode => "decode",
            FailureKind::Timeout => "timeout",
            FailureKind::OutputTooLarge => "output_too_large",
            FailureKind::Stream => "stream",
            FailureKind::Cancelled => "cancelled",
            FailureKind::PoolClosed => "pool_closed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
