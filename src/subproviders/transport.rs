//! Terminal chain layer that sends requests to the network.

use crate::{
    engine::{JsonRpcRequest, Next, Subprovider},
    provider::Result,
    transport::Transport,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Forwards every request it receives to the configured [`Transport`]
pub struct TransportSubprovider {
    transport: Arc<dyn Transport>,
}

impl TransportSubprovider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Subprovider for TransportSubprovider {
    fn name(&self) -> &'static str {
        "transport"
    }

    async fn handle(&self, request: JsonRpcRequest, _next: Next<'_>) -> Result<Value> {
        debug!(method = %request.method, "Forwarding request to node");
        Ok(self.transport.request(&request.method, request.params).await?)
    }
}
