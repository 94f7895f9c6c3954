//! Serves pending transaction counts from the shared nonce cache.

use crate::{
    engine::{JsonRpcRequest, Next, Subprovider, parse_quantity_u64, quantity},
    nonce::NonceCoordinator,
    provider::Result,
    wallet::recover_raw_transaction,
};
use alloy_primitives::Address;
use async_trait::async_trait;
use serde_json::Value;
use std::{str::FromStr, sync::Arc};
use tracing::{debug, warn};

/// Chain layer in front of the transport that keeps pending nonces monotonic.
///
/// - `eth_getTransactionCount` for the `pending` tag is answered from the cache,
///   or forwarded and used to seed it.
/// - A successful `eth_sendRawTransaction` advances the sender's cached nonce.
/// - `evm_revert` clears the cache.
pub struct NonceTracker {
    nonces: Arc<NonceCoordinator>,
}

impl NonceTracker {
    pub fn new(nonces: Arc<NonceCoordinator>) -> Self {
        Self { nonces }
    }

    async fn transaction_count(&self, request: JsonRpcRequest, next: Next<'_>) -> Result<Value> {
        let address = request.param(0).and_then(Value::as_str).and_then(|a| Address::from_str(a).ok());
        let block_tag = request.param(1).and_then(Value::as_str).unwrap_or("latest");

        let Some(address) = address.filter(|_| block_tag == "pending") else {
            return next.run(request).await;
        };

        if let Some(nonce) = self.nonces.cached(&address) {
            debug!(address = %address, nonce, "Serving cached pending nonce");
            return Ok(quantity(nonce));
        }

        let result = next.run(request).await?;
        match parse_quantity_u64(&result) {
            Ok(nonce) => {
                self.nonces.seed(address, nonce);
            },
            Err(e) => warn!(address = %address, error = %e, "Transaction count not cached"),
        }
        Ok(result)
    }

    async fn send_raw_transaction(&self, request: JsonRpcRequest, next: Next<'_>) -> Result<Value> {
        let raw = request
            .param(0)
            .and_then(Value::as_str)
            .and_then(|raw| hex::decode(raw.strip_prefix("0x").unwrap_or(raw)).ok());

        let result = next.run(request).await?;

        match raw.as_deref().map(recover_raw_transaction) {
            Some(Ok((sender, nonce))) => {
                self.nonces.record_sent(sender, nonce);
            },
            Some(Err(e)) => warn!(error = %e, "Sent transaction could not be decoded"),
            None => warn!("Sent transaction is not hex"),
        }
        Ok(result)
    }
}

#[async_trait]
impl Subprovider for NonceTracker {
    fn name(&self) -> &'static str {
        "nonce-tracker"
    }

    async fn handle(&self, request: JsonRpcRequest, next: Next<'_>) -> Result<Value> {
        match request.method.as_str() {
            "eth_getTransactionCount" => self.transaction_count(request, next).await,
            "eth_sendRawTransaction" => self.send_raw_transaction(request, next).await,
            "evm_revert" => {
                self.nonces.reset();
                next.run(request).await
            },
            _ => next.run(request).await,
        }
    }
}
