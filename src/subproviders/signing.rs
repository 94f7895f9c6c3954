//! Account listing and local signing for the derived accounts.

use crate::{
    engine::{
        JsonRpcRequest, Next, ProviderEngine, Subprovider, parse_quantity_u64,
        parse_quantity_u128,
    },
    nonce::NonceCoordinator,
    provider::{ProviderError, Result},
    wallet::{
        WalletRegistry, format_address, message_bytes, recover_personal_signer,
        sign_personal_message, sign_transaction, to_rpc_signature,
    },
};
use alloy_primitives::Address;
use alloy_rpc_types_eth::TransactionRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{str::FromStr, sync::Arc};
use tracing::debug;

/// Parameters of a message signing request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageParams {
    /// Message payload: `0x` hex or plain text
    pub data: Option<String>,
    /// Signing address
    pub from: String,
}

/// Answers account and signing requests from an in-memory [`WalletRegistry`].
///
/// Nothing here touches the network except the parameter filling done for
/// `eth_signTransaction`/`eth_sendTransaction`, which goes back through the
/// chain head.
pub struct SigningMiddleware {
    registry: Arc<WalletRegistry>,
    chain_id: Option<u64>,
    nonces: Option<Arc<NonceCoordinator>>,
}

impl SigningMiddleware {
    pub fn new(registry: Arc<WalletRegistry>, chain_id: Option<u64>) -> Self {
        Self { registry, chain_id, nonces: None }
    }

    /// Hold the coordinator's per-account lock while sending transactions
    pub fn with_nonce_coordinator(mut self, nonces: Arc<NonceCoordinator>) -> Self {
        self.nonces = Some(nonces);
        self
    }

    /// All derived addresses in derivation order
    pub fn get_accounts(&self) -> Vec<String> {
        self.registry.address_strings()
    }

    /// Hex private key of a derived address
    pub fn get_private_key(&self, address: &str) -> Result<String> {
        self.registry.private_key(address)
    }

    /// Sign a transaction with the key of `tx.from`, returning the raw `0x` hex
    pub fn sign_transaction(&self, tx: &TransactionRequest) -> Result<String> {
        let from = tx
            .from
            .ok_or_else(|| ProviderError::InvalidParams("transaction is missing `from`".into()))?;
        let binding = self
            .registry
            .get(&from)
            .ok_or_else(|| ProviderError::AccountNotFound(format_address(&from)))?;

        let raw = sign_transaction(binding.signer(), tx, self.chain_id)?;
        Ok(format!("0x{}", hex::encode(raw)))
    }

    /// Sign `data` as a personal message with the key of `from`
    pub fn sign_message(&self, params: &MessageParams) -> Result<String> {
        let data = params
            .data
            .as_deref()
            .filter(|data| !data.is_empty())
            .ok_or(ProviderError::NoDataToSign)?;
        let binding = self.registry.lookup(&params.from)?;

        let signature = sign_personal_message(binding.signer(), &message_bytes(data))?;
        Ok(to_rpc_signature(&signature))
    }

    /// Same as [`Self::sign_message`]
    pub fn sign_personal_message(&self, params: &MessageParams) -> Result<String> {
        self.sign_message(params)
    }

    fn transaction_param(request: &JsonRpcRequest) -> Result<TransactionRequest> {
        let params = request.param(0).ok_or_else(|| {
            ProviderError::InvalidParams(format!("{} expects a transaction object", request.method))
        })?;
        serde_json::from_value(params.clone())
            .map_err(|e| ProviderError::InvalidParams(format!("invalid transaction: {}", e)))
    }

    fn ensure_sender(&self, tx: &TransactionRequest) -> Result<Address> {
        let from = tx
            .from
            .ok_or_else(|| ProviderError::InvalidParams("transaction is missing `from`".into()))?;
        if !self.registry.contains(&from) {
            return Err(ProviderError::AccountNotFound(format_address(&from)));
        }
        Ok(from)
    }

    /// Fill in nonce, gas price, gas limit, and (for EIP-1559) chain id from the network
    async fn fill_transaction(
        &self,
        mut tx: TransactionRequest,
        engine: &ProviderEngine,
    ) -> Result<TransactionRequest> {
        let from = self.ensure_sender(&tx)?;
        let dynamic_fee = tx.max_fee_per_gas.is_some() || tx.transaction_type == Some(2);

        if tx.nonce.is_none() {
            let count = engine
                .dispatch(JsonRpcRequest::new(
                    "eth_getTransactionCount",
                    json!([format_address(&from), "pending"]),
                ))
                .await?;
            tx.nonce = Some(parse_quantity_u64(&count)?);
        }

        if !dynamic_fee && tx.gas_price.is_none() {
            let price = engine.dispatch(JsonRpcRequest::new("eth_gasPrice", json!([]))).await?;
            tx.gas_price = Some(parse_quantity_u128(&price)?);
        }

        if dynamic_fee && tx.chain_id.is_none() && self.chain_id.is_none() {
            let chain_id = engine.dispatch(JsonRpcRequest::new("eth_chainId", json!([]))).await?;
            tx.chain_id = Some(parse_quantity_u64(&chain_id)?);
        }

        if tx.gas.is_none() {
            let estimate_params = serde_json::to_value(&tx)
                .map_err(|e| ProviderError::InvalidParams(e.to_string()))?;
            let estimate = engine
                .dispatch(JsonRpcRequest::new("eth_estimateGas", json!([estimate_params])))
                .await?;
            tx.gas = Some(parse_quantity_u64(&estimate)?);
        }

        Ok(tx)
    }

    async fn send_transaction(&self, tx: TransactionRequest, engine: &ProviderEngine) -> Result<Value> {
        let from = self.ensure_sender(&tx)?;
        let _account_guard = match &self.nonces {
            Some(nonces) => Some(nonces.lock_account(from).await),
            None => None,
        };

        let tx = self.fill_transaction(tx, engine).await?;
        let raw = self.sign_transaction(&tx)?;
        debug!(from = %from, nonce = ?tx.nonce, "Submitting signed transaction");

        engine.dispatch(JsonRpcRequest::new("eth_sendRawTransaction", json!([raw]))).await
    }

    /// `personal_sign` is `[data, address]`, but some callers send `[address, data]`
    fn personal_sign_params(&self, request: &JsonRpcRequest) -> Result<MessageParams> {
        let first = request.param(0).and_then(Value::as_str);
        let second = request.param(1).and_then(Value::as_str);

        let is_registered = |value: &str| {
            Address::from_str(value).map(|address| self.registry.contains(&address)).unwrap_or(false)
        };

        match (first, second) {
            (Some(address), Some(data)) if is_registered(address) && !is_registered(data) => {
                Ok(MessageParams { data: Some(data.to_string()), from: address.to_string() })
            },
            (data, Some(address)) => {
                Ok(MessageParams { data: data.map(str::to_string), from: address.to_string() })
            },
            (Some(_), None) => Err(ProviderError::InvalidParams(
                "personal_sign expects `address` at position 1".to_string(),
            )),
            (None, None) => Err(ProviderError::NoDataToSign),
        }
    }
}

#[async_trait]
impl Subprovider for SigningMiddleware {
    fn name(&self) -> &'static str {
        "signing"
    }

    async fn handle(&self, request: JsonRpcRequest, next: Next<'_>) -> Result<Value> {
        match request.method.as_str() {
            "eth_accounts" => Ok(json!(self.get_accounts())),
            "eth_coinbase" => Ok(self
                .registry
                .address(None)
                .map(|address| json!(format_address(&address)))
                .unwrap_or(Value::Null)),
            "eth_sign" => {
                let params = MessageParams {
                    from: request.str_param(0, "address")?.to_string(),
                    data: request.param(1).and_then(Value::as_str).map(str::to_string),
                };
                Ok(json!(self.sign_message(&params)?))
            },
            "personal_sign" => {
                let params = self.personal_sign_params(&request)?;
                Ok(json!(self.sign_personal_message(&params)?))
            },
            "personal_ecRecover" => {
                let data = request.str_param(0, "data")?;
                let signature = request.str_param(1, "signature")?;
                let signer = recover_personal_signer(&message_bytes(data), signature)?;
                Ok(json!(format_address(&signer)))
            },
            "eth_signTransaction" => {
                let tx = Self::transaction_param(&request)?;
                let tx = self.fill_transaction(tx, next.engine()).await?;
                Ok(json!(self.sign_transaction(&tx)?))
            },
            "eth_sendTransaction" => {
                let tx = Self::transaction_param(&request)?;
                self.send_transaction(tx, next.engine()).await
            },
            _ => next.run(request).await,
        }
    }
}
