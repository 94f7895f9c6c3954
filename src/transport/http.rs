//! JSON-RPC over HTTP(S) with reqwest.

use super::Transport;
use crate::provider::TransportError;
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde_json::{Value, json};
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tracing::trace;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport bound to one endpoint
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    url: Url,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Create a transport for `url` that sends `headers` with every request
    pub fn new(url: &str, headers: &HashMap<String, String>) -> Result<Self, TransportError> {
        let url = Url::parse(url)
            .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::InvalidEndpoint(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }

        let mut header_map = HeaderMap::new();
        header_map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidEndpoint(format!("header {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidEndpoint(format!("header {}: {}", name, e)))?;
            header_map.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(header_map)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;

        Ok(Self { client, url, next_id: AtomicU64::new(1) })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let params = if params.is_null() { json!([]) } else { params };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        trace!(method, id, "Sending HTTP request");

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| TransportError::Http(e.to_string()))?;
        let payload: Value = match serde_json::from_str(&text) {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => {
                return Err(TransportError::Http(format!("{}: {}", status, text)));
            },
            Err(e) => return Err(TransportError::InvalidResponse(e.to_string())),
        };

        parse_response(payload)
    }
}

/// Extract `result` from a JSON-RPC response, or its `error` as [`TransportError::Rpc`]
pub(crate) fn parse_response(mut payload: Value) -> Result<Value, TransportError> {
    if let Some(error) = payload.get("error").filter(|error| !error.is_null()) {
        return Err(TransportError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(-32603),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
            data: error.get("data").cloned(),
        });
    }

    match payload.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(TransportError::InvalidResponse(format!(
            "response has neither result nor error: {}",
            payload
        ))),
    }
}
