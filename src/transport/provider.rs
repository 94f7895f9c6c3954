//! Adapter that lets an existing alloy provider act as the chain's transport.

use super::Transport;
use crate::provider::TransportError;
use alloy_provider::Provider;
use async_trait::async_trait;
use serde_json::Value;
use std::borrow::Cow;

/// Forwards raw JSON-RPC calls to a pre-built alloy [`Provider`]
#[derive(Debug, Clone)]
pub struct ProviderTransport<P> {
    provider: P,
}

impl<P> ProviderTransport<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn inner(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P> Transport for ProviderTransport<P>
where
    P: Provider + Send + Sync + 'static,
{
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let params = if params.is_null() { Value::Array(Vec::new()) } else { params };
        self.provider
            .raw_request::<Value, Value>(Cow::Owned(method.to_string()), params)
            .await
            .map_err(|err| match err.as_error_resp() {
                Some(payload) => TransportError::Rpc {
                    code: payload.code,
                    message: payload.message.to_string(),
                    data: payload.data.as_ref().and_then(|raw| serde_json::from_str(raw.get()).ok()),
                },
                None => TransportError::Http(err.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_provider::ProviderBuilder;
    use axum::{Json, Router, routing::post};
    use serde_json::json;
    use url::Url;

    /// Answers `eth_chainId` and rejects everything else with a revert carrying data
    async fn node_url() -> Url {
        let app = Router::new().route(
            "/",
            post(|Json(body): Json<Value>| async move {
                let response = match body["method"].as_str() {
                    Some("eth_chainId") => json!({ "jsonrpc": "2.0", "id": body["id"], "result": "0x7a69" }),
                    _ => json!({
                        "jsonrpc": "2.0",
                        "id": body["id"],
                        "error": { "code": 3, "message": "execution reverted", "data": "0x08c379a0" }
                    }),
                };
                Json(response)
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        url
    }

    #[tokio::test]
    async fn test_result_is_returned() {
        let transport = ProviderTransport::new(ProviderBuilder::new().on_http(node_url().await));

        let result = transport.request("eth_chainId", Value::Null).await.unwrap();
        assert_eq!(result, json!("0x7a69"));
    }

    #[tokio::test]
    async fn test_node_error_keeps_code_message_and_data() {
        let transport = ProviderTransport::new(ProviderBuilder::new().on_http(node_url().await));

        match transport.request("eth_call", json!([{}, "latest"])).await {
            Err(TransportError::Rpc { code, message, data }) => {
                assert_eq!(code, 3);
                assert_eq!(message, "execution reverted");
                assert_eq!(data, Some(json!("0x08c379a0")));
            },
            other => panic!("expected rpc error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_http_error() {
        let url = Url::parse("http://127.0.0.1:1").unwrap();
        let transport = ProviderTransport::new(ProviderBuilder::new().on_http(url));

        let result = transport.request("eth_chainId", json!([])).await;
        assert!(matches!(result, Err(TransportError::Http(_))));
    }
}
