//! Ordered middleware chain that resolves or forwards JSON-RPC requests.
//!
//! Each [`Subprovider`] either answers a request itself or hands it to the
//! next layer through [`Next`]. The last layer is expected to be terminal
//! (the network transport). Layers that need to issue their own requests,
//! such as filling in a transaction nonce, re-enter the chain from its head
//! through [`Next::engine`] so every layer sees them.

mod types;

pub use types::{
    JsonRpcErrorObject, JsonRpcRequest, JsonRpcResponse, RequestPayload, ResponseBody,
    ResponsePayload, parse_quantity, parse_quantity_u64, parse_quantity_u128, quantity,
};

use crate::provider::{ProviderError, Result};
use async_trait::async_trait;
use futures::future::{BoxFuture, join_all};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// A layer of the middleware chain
#[async_trait]
pub trait Subprovider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Answer the request or pass it on with `next.run(request)`
    async fn handle(&self, request: JsonRpcRequest, next: Next<'_>) -> Result<Value>;
}

/// Handle to the remainder of the chain after the current layer
#[derive(Clone, Copy)]
pub struct Next<'a> {
    engine: &'a ProviderEngine,
    position: usize,
}

impl<'a> Next<'a> {
    /// Forward the request to the next layer
    pub async fn run(self, request: JsonRpcRequest) -> Result<Value> {
        self.engine.handle_at(self.position, request).await
    }

    /// The whole chain, for requests that must pass through every layer
    pub fn engine(&self) -> &'a ProviderEngine {
        self.engine
    }
}

/// The middleware chain
#[derive(Default)]
pub struct ProviderEngine {
    layers: Vec<Arc<dyn Subprovider>>,
}

impl ProviderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer behind the existing ones
    pub fn add_provider(&mut self, layer: Arc<dyn Subprovider>) -> &mut Self {
        self.layers.push(layer);
        self
    }

    /// Names of the layers, head first
    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    /// Run a request through the chain from its head
    pub async fn dispatch(&self, request: JsonRpcRequest) -> Result<Value> {
        debug!(method = %request.method, "Dispatching request");
        self.handle_at(0, request).await
    }

    /// Run a request and wrap the outcome in a response carrying the request id
    pub async fn respond(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        JsonRpcResponse::from_result(id, self.dispatch(request).await)
    }

    /// Run a single request or a batch; batch members run concurrently and keep their order
    pub async fn respond_payload(&self, payload: RequestPayload) -> ResponsePayload {
        match payload {
            RequestPayload::Single(request) => ResponsePayload::Single(self.respond(request).await),
            RequestPayload::Batch(requests) => ResponsePayload::Batch(
                join_all(requests.into_iter().map(|request| self.respond(request))).await,
            ),
        }
    }

    fn handle_at(&self, position: usize, request: JsonRpcRequest) -> BoxFuture<'_, Result<Value>> {
        match self.layers.get(position) {
            Some(layer) => layer.handle(request, Next { engine: self, position: position + 1 }),
            None => Box::pin(async move {
                Err(ProviderError::UnsupportedMethod(format!(
                    "Request for method \"{}\" not handled by any subprovider",
                    request.method
                )))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Answer(&'static str, Value);

    #[async_trait]
    impl Subprovider for Answer {
        fn name(&self) -> &'static str {
            "answer"
        }

        async fn handle(&self, request: JsonRpcRequest, next: Next<'_>) -> Result<Value> {
            if request.method == self.0 { Ok(self.1.clone()) } else { next.run(request).await }
        }
    }

    /// Answers `outer` by asking the chain head for `inner`
    struct Reentrant;

    #[async_trait]
    impl Subprovider for Reentrant {
        fn name(&self) -> &'static str {
            "reentrant"
        }

        async fn handle(&self, request: JsonRpcRequest, next: Next<'_>) -> Result<Value> {
            if request.method == "outer" {
                let inner = next.engine().dispatch(JsonRpcRequest::new("inner", json!([]))).await?;
                Ok(json!({ "wrapped": inner }))
            } else {
                next.run(request).await
            }
        }
    }

    fn engine() -> ProviderEngine {
        let mut engine = ProviderEngine::new();
        engine
            .add_provider(Arc::new(Reentrant))
            .add_provider(Arc::new(Answer("first", json!(1))))
            .add_provider(Arc::new(Answer("inner", json!("deep"))));
        engine
    }

    #[tokio::test]
    async fn test_requests_fall_through_in_order() {
        let engine = engine();
        assert_eq!(engine.dispatch(JsonRpcRequest::new("first", json!([]))).await.unwrap(), json!(1));
        assert_eq!(engine.layer_names(), vec!["reentrant", "answer", "answer"]);
    }

    #[tokio::test]
    async fn test_layers_can_reenter_the_chain() {
        let result = engine().dispatch(JsonRpcRequest::new("outer", json!([]))).await.unwrap();
        assert_eq!(result, json!({ "wrapped": "deep" }));
    }

    #[tokio::test]
    async fn test_unhandled_method_errors() {
        let result = engine().dispatch(JsonRpcRequest::new("nobody", json!([]))).await;
        assert!(matches!(result, Err(ProviderError::UnsupportedMethod(_))));
    }

    #[tokio::test]
    async fn test_batch_keeps_order_and_ids() {
        let payload = RequestPayload::Batch(vec![
            JsonRpcRequest { id: json!("b"), ..JsonRpcRequest::new("inner", json!([])) },
            JsonRpcRequest { id: json!("a"), ..JsonRpcRequest::new("first", json!([])) },
            JsonRpcRequest { id: json!("c"), ..JsonRpcRequest::new("nobody", json!([])) },
        ]);

        match engine().respond_payload(payload).await {
            ResponsePayload::Batch(responses) => {
                let ids: Vec<_> = responses.iter().map(|response| response.id.clone()).collect();
                assert_eq!(ids, vec![json!("b"), json!("a"), json!("c")]);
                assert_eq!(responses[0].result(), Some(&json!("deep")));
                assert_eq!(responses[1].result(), Some(&json!(1)));
                assert!(responses[2].error_object().is_some());
            },
            other => panic!("expected batch, got {:?}", other),
        }
    }
}
