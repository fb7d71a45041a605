//! Invocation counters.

use crate::domain::{FailureKind, WorkerResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Broker-wide counters, shared by every invocation
#[derive(Debug, Default)]
pub struct BrokerStats {
    pub started: AtomicU64,
    pub succeeded: AtomicU64,
    pub in_flight: AtomicU64,

    pub failed_spawn: AtomicU64,
    pub failed_worker: AtomicU64,
    pub failed_decode: AtomicU64,
    pub failed_timeout: AtomicU64,
    pub cancelled: AtomicU64,
    pub failed_other: AtomicU64,
}

impl BrokerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an invocation as started; the returned guard keeps it in flight
    pub fn begin(self: &Arc<Self>) -> InFlightGuard {
        self.started.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            stats: Arc::clone(self),
        }
    }

    pub fn record_outcome(&self, result: &WorkerResult) {
        let counter = match result {
            Ok(_) => &self.succeeded,
            Err(failure) => match failure.kind() {
                FailureKind::Spawn => &self.failed_spawn,
                FailureKind::Worker => &self.failed_worker,
                FailureKind::Decode => &self.failed_decode,
                FailureKind::Timeout => &self.failed_timeout,
                FailureKind::Cancelled => &self.cancelled,
                FailureKind::OutputTooLarge | FailureKind::Stream | FailureKind::PoolClosed => {
                    &self.failed_other
                }
            },
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Export counters as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "started": self.started.load(Ordering::Relaxed),
            "succeeded": self.succeeded.load(Ordering::Relaxed),
            "in_flight": self.in_flight.load(Ordering::Relaxed),
            "failed": {
                "spawn": self.failed_spawn.load(Ordering::Relaxed),
                "worker": self.failed_worker.load(Ordering::Relaxed),
                "decode": self.failed_decode.load(Ordering::Relaxed),
                "timeout": self.failed_timeout.load(Ordering::Relaxed),
                "other": self.failed_other.load(Ordering::Relaxed),
            },
            "cancelled": self.cancelled.load(Ordering::Relaxed),
        })
    }
}

/// Decrements the in-flight gauge on drop, including when the invocation
/// future is dropped mid-way
pub struct InFlightGuard {
    stats: Arc<BrokerStats>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
