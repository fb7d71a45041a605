//! HTTP handlers.
//!
//! Each encryption handler owns a `CancellationToken` through a drop guard.
//! If the client disconnects, axum drops the handler future, the guard
//! cancels the token and the running worker processes are killed.

use crate::domain::{
    ApiResult, ChatEncryptRequest, ChatEncryptResponse, EncryptRequest, HealthResponse,
};
use crate::middleware::GatewayMetrics;
use axum::{extract::State, Json};
use cipher_broker::{BrokerStats, EncryptionRequest, SelectiveEncryptionPolicy, WorkerInvoker};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub invoker: Arc<dyn WorkerInvoker>,
    pub policy: SelectiveEncryptionPolicy,
    pub metrics: Arc<GatewayMetrics>,
    pub broker_stats: Arc<BrokerStats>,
}

impl AppState {
    pub fn new(invoker: Arc<dyn WorkerInvoker>, broker_stats: Arc<BrokerStats>) -> Self {
        Self {
            policy: SelectiveEncryptionPolicy::new(Arc::clone(&invoker)),
            invoker,
            metrics: Arc::new(GatewayMetrics::new()),
            broker_stats,
        }
    }
}

/// `POST /encrypt`: hand `data` to one worker and relay its JSON result
pub async fn encrypt(
    State(state): State<AppState>,
    Json(request): Json<EncryptRequest>,
) -> ApiResult<Json<Value>> {
    let cancel = CancellationToken::new();
    let _abort_on_drop = cancel.clone().drop_guard();

    debug!("Direct encryption request");
    let request = EncryptionRequest::encrypt(request.data, request.password);
    let result = state.invoker.encrypt(request, cancel).await?;
    Ok(Json(result))
}

/// `POST /chat/encrypt`: encrypt the sensitive messages of a conversation
pub async fn chat_encrypt(
    State(state): State<AppState>,
    Json(request): Json<ChatEncryptRequest>,
) -> ApiResult<Json<ChatEncryptResponse>> {
    let cancel = CancellationToken::new();
    let _abort_on_drop = cancel.clone().drop_guard();

    let sensitive = request.messages.iter().filter(|m| m.sensitive).count();
    info!(
        messages = request.messages.len(),
        sensitive = sensitive,
        "Chat encryption request"
    );

    let messages = state
        .policy
        .apply(request.messages, &request.password, &cancel)
        .await?;
    Ok(Json(ChatEncryptResponse { messages }))
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "gateway": state.metrics.to_json(),
        "worker": state.broker_stats.to_json(),
    }))
}
