//! JSON-RPC 2.0 payloads exchanged with the middleware chain.

use crate::provider::{ProviderError, Result};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn default_version() -> String {
    "2.0".to_string()
}

/// A single JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    /// Create a request with a fresh process-unique id
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        let id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        Self { jsonrpc: default_version(), id: json!(id), method: method.into(), params }
    }

    /// Positional parameter, if present
    pub fn param(&self, index: usize) -> Option<&Value> {
        self.params.as_array().and_then(|params| params.get(index))
    }

    /// Positional parameter that must be a string
    pub fn str_param(&self, index: usize, name: &str) -> Result<&str> {
        self.param(index).and_then(Value::as_str).ok_or_else(|| {
            ProviderError::InvalidParams(format!("{} expects `{}` at position {}", self.method, name, index))
        })
    }
}

/// Error member of a failed JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<&ProviderError> for JsonRpcErrorObject {
    fn from(error: &ProviderError) -> Self {
        Self { code: error.code(), message: error.rpc_message(), data: error.rpc_data() }
    }
}

/// Outcome carried by a response: exactly one of `result` or `error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseBody {
    Result(Value),
    Error(JsonRpcErrorObject),
}

/// A single JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: default_version(), id, body: ResponseBody::Result(result) }
    }

    pub fn failure(id: Value, error: &ProviderError) -> Self {
        Self { jsonrpc: default_version(), id, body: ResponseBody::Error(error.into()) }
    }

    /// Failure with an explicit code, for errors raised before a request is parsed
    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            body: ResponseBody::Error(JsonRpcErrorObject {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    pub fn from_result(id: Value, result: Result<Value>) -> Self {
        match result {
            Ok(value) => Self::success(id, value),
            Err(error) => Self::failure(id, &error),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Result(value) => Some(value),
            ResponseBody::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&JsonRpcErrorObject> {
        match &self.body {
            ResponseBody::Result(_) => None,
            ResponseBody::Error(error) => Some(error),
        }
    }
}

/// A request body: one request or a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestPayload {
    Single(JsonRpcRequest),
    Batch(Vec<JsonRpcRequest>),
}

impl From<JsonRpcRequest> for RequestPayload {
    fn from(request: JsonRpcRequest) -> Self {
        RequestPayload::Single(request)
    }
}

/// A response body matching the shape of its [`RequestPayload`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Single(JsonRpcResponse),
    Batch(Vec<JsonRpcResponse>),
}

/// Parse a JSON-RPC quantity: a `0x` hex string, a decimal string, or a JSON number.
pub fn parse_quantity(value: &Value) -> Result<U256> {
    match value {
        Value::String(text) => text
            .parse::<U256>()
            .map_err(|e| ProviderError::InvalidParams(format!("invalid quantity {}: {}", text, e))),
        Value::Number(number) => number
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| ProviderError::InvalidParams(format!("invalid quantity {}", number))),
        other => Err(ProviderError::InvalidParams(format!("invalid quantity {}", other))),
    }
}

/// Parse a quantity that must fit in a `u64`
pub fn parse_quantity_u64(value: &Value) -> Result<u64> {
    let quantity = parse_quantity(value)?;
    u64::try_from(quantity)
        .map_err(|_| ProviderError::InvalidParams(format!("quantity {} overflows u64", quantity)))
}

/// Parse a quantity that must fit in a `u128`
pub fn parse_quantity_u128(value: &Value) -> Result<u128> {
    let quantity = parse_quantity(value)?;
    u128::try_from(quantity)
        .map_err(|_| ProviderError::InvalidParams(format!("quantity {} overflows u128", quantity)))
}

/// Encode a `u64` as a JSON-RPC quantity
pub fn quantity(value: u64) -> Value {
    Value::String(format!("{:#x}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serializes_null_result() {
        let response = JsonRpcResponse::success(json!(4), Value::Null);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"jsonrpc": "2.0", "id": 4, "result": null})
        );
    }

    #[test]
    fn test_failure_serializes_error_object() {
        let response = JsonRpcResponse::failure(json!("a"), &ProviderError::NoDataToSign);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": "a",
                "error": {"code": -32602, "message": "No data to sign"}
            })
        );
    }

    #[test]
    fn test_batch_payload_parses() {
        let payload: RequestPayload = serde_json::from_value(json!([
            {"jsonrpc": "2.0", "id": 1, "method": "eth_accounts", "params": []},
            {"id": 2, "method": "eth_chainId"}
        ]))
        .unwrap();

        match payload {
            RequestPayload::Batch(requests) => {
                assert_eq!(requests.len(), 2);
                assert_eq!(requests[1].jsonrpc, "2.0");
                assert_eq!(requests[1].params, Value::Null);
            },
            other => panic!("expected batch, got {:?}", other),
        }
    }

    #[test]
    fn test_quantities() {
        assert_eq!(parse_quantity_u64(&json!("0x1a")).unwrap(), 26);
        assert_eq!(parse_quantity_u64(&json!("26")).unwrap(), 26);
        assert_eq!(parse_quantity_u64(&json!(26)).unwrap(), 26);
        assert!(parse_quantity_u64(&json!("0xzz")).is_err());
        assert!(parse_quantity_u64(&json!(null)).is_err());
        assert_eq!(quantity(26), json!("0x1a"));
        assert_eq!(quantity(0), json!("0x0"));
    }

    #[test]
    fn test_fresh_ids_are_unique() {
        let first = JsonRpcRequest::new("eth_chainId", json!([]));
        let second = JsonRpcRequest::new("eth_chainId", json!([]));
        assert_ne!(first.id, second.id);
    }
}
