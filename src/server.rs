//! Local JSON-RPC endpoint backed by an [`HdWalletProvider`].
//!
//! Wallets and scripts that cannot embed the provider point at this server
//! instead of the node; signing happens here and everything else is forwarded.

use crate::{
    engine::{JsonRpcResponse, RequestPayload, ResponsePayload},
    provider::{HdWalletProvider, INVALID_REQUEST, PARSE_ERROR},
};
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use std::{
    future::Future,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

#[derive(Clone)]
struct AppState {
    provider: HdWalletProvider,
    stopping: Arc<AtomicBool>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    accounts: usize,
}

/// JSON-RPC over HTTP in front of a provider
#[derive(Clone)]
pub struct RpcServer {
    provider: HdWalletProvider,
    stopping: Arc<AtomicBool>,
}

impl RpcServer {
    pub fn new(provider: HdWalletProvider) -> Self {
        Self { provider, stopping: Arc::new(AtomicBool::new(false)) }
    }

    /// `POST /` answers JSON-RPC requests and batches, `GET /health` reports liveness
    pub fn router(&self) -> Router {
        let state = AppState { provider: self.provider.clone(), stopping: Arc::clone(&self.stopping) };
        Router::new()
            .route("/", post(handle_rpc))
            .route("/health", get(health_check))
            .with_state(state)
    }

    /// Bind `addr` and serve until `shutdown` resolves
    pub async fn run(
        &self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        info!("Starting JSON-RPC server on {}", listener.local_addr()?);

        let stopping = Arc::clone(&self.stopping);
        let signal = async move {
            shutdown.await;
            stopping.store(true, Ordering::SeqCst);
            info!("JSON-RPC server received shutdown signal");
        };

        axum::serve(listener, self.router()).with_graceful_shutdown(signal).await
    }
}

async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!("Rejected unparsable request body: {}", e);
            return Json(JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e)))
                .into_response();
        },
    };

    let payload = match serde_json::from_value::<RequestPayload>(value) {
        Ok(RequestPayload::Batch(requests)) if requests.is_empty() => {
            return Json(JsonRpcResponse::error(Value::Null, INVALID_REQUEST, "Empty batch"))
                .into_response();
        },
        Ok(payload) => payload,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                Value::Null,
                INVALID_REQUEST,
                format!("Invalid request: {}", e),
            ))
            .into_response();
        },
    };

    let response = state.provider.request_payload(payload).await;
    if let ResponsePayload::Batch(responses) = &response {
        debug!(size = responses.len(), "Answered batch");
    }
    Json(response).into_response()
}

async fn health_check(State(state): State<AppState>) -> Response {
    if state.stopping.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse { status: "shutting_down", accounts: 0 }),
        )
            .into_response();
    }

    let accounts = state.provider.get_addresses().len();
    (StatusCode::OK, Json(HealthResponse { status: "healthy", accounts })).into_response()
}
