//! Record of one terminated worker process and its classification.

use crate::domain::error::{WorkerFailure, WorkerResult};
use serde_json::Value;
use std::fmt;

/// Everything observed from one worker process.
///
/// Only built once the process has exited and both pipes reached EOF, so the
/// buffers are complete by construction.
pub struct WorkerInvocation {
    /// Arguments after the configured program prefix
    pub arguments: Vec<String>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// Set when stdout exceeded the cap; holds the cap in bytes
    pub stdout_overflow: Option<usize>,
}

impl WorkerInvocation {
    pub fn new(arguments: Vec<String>) -> Self {
        Self {
            arguments,
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
            stdout_overflow: None,
        }
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }

    /// Classify the terminated process.
    ///
    /// Exit status is checked before stdout is looked at: a failing worker
    /// is a `Worker` failure regardless of what it printed.
    pub fn decode(self) -> WorkerResult {
        match self.exit_code {
            Some(0) => {}
            exit_code => {
                return Err(WorkerFailure::Worker {
                    exit_code,
                    stderr: self.stderr_text(),
                })
            }
        }

        if let Some(limit) = self.stdout_overflow {
            return Err(WorkerFailure::OutputTooLarge { limit });
        }

        let raw = self.stdout_text();
        serde_json::from_str::<Value>(&raw).map_err(|e| WorkerFailure::decode(raw.clone(), &e))
    }
}

// Arguments carry the password, so only their count is shown.
impl fmt::Debug for WorkerInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerInvocation")
            .field("arguments", &self.arguments.len())
            .field("stdout_len", &self.stdout.len())
            .field("stderr_len", &self.stderr.len())
            .field("exit_code", &self.exit_code)
            .field("stdout_overflow", &self.stdout_overflow)
            .finish()
    }
}
