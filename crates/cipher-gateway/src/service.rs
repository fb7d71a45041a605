//! Cipher gateway service: router construction and server lifecycle.

use crate::domain::{GatewayConfig, GatewayError};
use crate::handlers::{self, AppState};
use crate::middleware::{create_cors_layer, AuthLayer, GatewayMetrics, TracingLayer};
use axum::{
    routing::{get, post},
    Router,
};
use cipher_broker::{BrokerStats, ProcessWorker, WorkerInvoker};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

/// Cipher gateway service state
pub struct CipherGatewayService {
    config: GatewayConfig,
    state: AppState,
    worker: Option<Arc<ProcessWorker>>,
    shutdown: CancellationToken,
}

impl CipherGatewayService {
    /// Validate the configuration and build the worker pool
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;

        let worker = Arc::new(ProcessWorker::new(config.worker.clone())?);
        let state = AppState::new(worker.clone(), worker.stats());

        info!(
            program = %config.worker.program.display(),
            max_concurrent = config.worker.max_concurrent,
            timeout_ms = config.worker.timeout.as_millis() as u64,
            "Worker pool ready"
        );

        Ok(Self {
            config,
            state,
            worker: Some(worker),
            shutdown: CancellationToken::new(),
        })
    }

    /// Build the service around another invoker (used by tests)
    pub fn with_invoker(
        config: GatewayConfig,
        invoker: Arc<dyn WorkerInvoker>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        Ok(Self {
            config,
            state: AppState::new(invoker, Arc::new(BrokerStats::new())),
            worker: None,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.state.metrics)
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        let encryption = Router::new()
            .route("/encrypt", post(handlers::encrypt))
            .route("/chat/encrypt", post(handlers::chat_encrypt))
            .route_layer(AuthLayer::new(self.config.auth.clone()));

        Router::new()
            .merge(encryption)
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .layer(RequestBodyLimitLayer::new(self.config.limits.max_request_size))
            .layer(TracingLayer::new(Arc::clone(&self.state.metrics)))
            .layer(create_cors_layer(&self.config.cors))
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until [`shutdown`](Self::shutdown)
    pub async fn start(&self) -> Result<(), GatewayError> {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until [`shutdown`](Self::shutdown)
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GatewayError> {
        let addr = listener.local_addr().map_err(GatewayError::Serve)?;
        info!(addr = %addr, "Cipher gateway listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(self.shutdown.clone().cancelled_owned())
            .await
            .map_err(GatewayError::Serve)?;

        if let Some(worker) = &self.worker {
            worker.close();
        }
        info!("Cipher gateway stopped");
        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
