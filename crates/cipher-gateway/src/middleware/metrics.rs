//! Request counters exposed on `GET /metrics`.

use axum::http::StatusCode;
use std::sync::atomic::{AtomicU64, Ordering};

/// Gateway request metrics
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    // Request counters
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,
    pub requests_client_error: AtomicU64,
    pub requests_server_error: AtomicU64,

    pub unauthorized: AtomicU64,
    pub worker_timeouts: AtomicU64,

    // Sum of request latencies; averaged over `requests_total`
    pub total_latency_ms: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished request
    pub fn record_response(&self, status: StatusCode, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let class = if status.is_success() {
            &self.requests_success
        } else if status.is_client_error() {
            &self.requests_client_error
        } else {
            &self.requests_server_error
        };
        class.fetch_add(1, Ordering::Relaxed);

        match status {
            StatusCode::UNAUTHORIZED => {
                self.unauthorized.fetch_add(1, Ordering::Relaxed);
            }
            StatusCode::GATEWAY_TIMEOUT => {
                self.worker_timeouts.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    /// Get average latency in ms
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.requests_total.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "success": self.requests_success.load(Ordering::Relaxed),
                "client_error": self.requests_client_error.load(Ordering::Relaxed),
                "server_error": self.requests_server_error.load(Ordering::Relaxed),
                "unauthorized": self.unauthorized.load(Ordering::Relaxed),
                "worker_timeouts": self.worker_timeouts.load(Ordering::Relaxed),
            },
            "latency": {
                "average_ms": self.average_latency_ms(),
            }
        })
    }
}
