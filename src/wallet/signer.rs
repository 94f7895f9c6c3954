//! Transaction and message signing with in-memory keys.

use crate::provider::{ProviderError, Result};
use alloy_consensus::{SignableTransaction, Signed, Transaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::{Decodable2718, Encodable2718};
use alloy_primitives::{Address, Bytes, Signature, TxKind, U256};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;

/// Unsigned transaction built from JSON-RPC transaction parameters
#[derive(Debug, Clone, PartialEq)]
pub enum UnsignedTransaction {
    Legacy(TxLegacy),
    Eip1559(TxEip1559),
}

impl UnsignedTransaction {
    /// Build a transaction from request parameters.
    ///
    /// Missing numeric fields default to zero. EIP-1559 is used when
    /// `maxFeePerGas` is present or `type` is 2, and then needs a chain id.
    /// Legacy transactions are EIP-155 protected whenever a chain id is known.
    pub fn from_request(request: &TransactionRequest, default_chain_id: Option<u64>) -> Result<Self> {
        let chain_id = request.chain_id.or(default_chain_id);
        let to = request.to.unwrap_or(TxKind::Create);
        let value = request.value.unwrap_or(U256::ZERO);
        let input = request.input.input().cloned().unwrap_or_default();
        let nonce = request.nonce.unwrap_or_default();
        let gas_limit = request.gas.unwrap_or_default();

        let dynamic_fee = match request.transaction_type {
            None | Some(0) => request.max_fee_per_gas.is_some(),
            Some(2) => true,
            Some(other) => {
                return Err(ProviderError::InvalidParams(format!(
                    "unsupported transaction type {}",
                    other
                )));
            },
        };

        if dynamic_fee {
            let chain_id = chain_id.ok_or_else(|| {
                ProviderError::InvalidParams("chainId is required for EIP-1559 transactions".into())
            })?;
            return Ok(UnsignedTransaction::Eip1559(TxEip1559 {
                chain_id,
                nonce,
                gas_limit,
                max_fee_per_gas: request.max_fee_per_gas.unwrap_or_default(),
                max_priority_fee_per_gas: request.max_priority_fee_per_gas.unwrap_or_default(),
                to,
                value,
                access_list: request.access_list.clone().unwrap_or_default(),
                input,
            }));
        }

        Ok(UnsignedTransaction::Legacy(TxLegacy {
            chain_id,
            nonce,
            gas_price: request.gas_price.unwrap_or_default(),
            gas_limit,
            to,
            value,
            input,
        }))
    }

    /// Sign with a recoverable ECDSA signature and wrap in an envelope
    pub fn sign(self, signer: &PrivateKeySigner) -> Result<TxEnvelope> {
        match self {
            UnsignedTransaction::Legacy(tx) => sign_with(signer, tx),
            UnsignedTransaction::Eip1559(tx) => sign_with(signer, tx),
        }
    }
}

fn sign_with<T>(signer: &PrivateKeySigner, tx: T) -> Result<TxEnvelope>
where
    T: SignableTransaction<Signature>,
    TxEnvelope: From<Signed<T>>,
{
    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .map_err(|e| ProviderError::Signing(e.to_string()))?;
    Ok(TxEnvelope::from(tx.into_signed(signature)))
}

/// Sign transaction parameters and return the EIP-2718 encoded bytes
pub fn sign_transaction(
    signer: &PrivateKeySigner,
    request: &TransactionRequest,
    default_chain_id: Option<u64>,
) -> Result<Bytes> {
    let envelope = UnsignedTransaction::from_request(request, default_chain_id)?.sign(signer)?;
    Ok(Bytes::from(envelope.encoded_2718()))
}

/// Decode a signed raw transaction and recover its sender and nonce
pub fn recover_raw_transaction(raw: &[u8]) -> Result<(Address, u64)> {
    let envelope = TxEnvelope::decode_2718(&mut &raw[..])
        .map_err(|e| ProviderError::InvalidParams(format!("undecodable raw transaction: {}", e)))?;

    match &envelope {
        TxEnvelope::Legacy(signed) => recover_signed(signed),
        TxEnvelope::Eip2930(signed) => recover_signed(signed),
        TxEnvelope::Eip1559(signed) => recover_signed(signed),
        _ => Err(ProviderError::InvalidParams("unsupported transaction type".to_string())),
    }
}

fn recover_signed<T>(signed: &Signed<T>) -> Result<(Address, u64)>
where
    T: SignableTransaction<Signature>,
{
    let sender = signed
        .signature()
        .recover_address_from_prehash(&signed.tx().signature_hash())
        .map_err(|e| ProviderError::Signing(e.to_string()))?;
    Ok((sender, signed.tx().nonce()))
}

/// Sign `data` under the `"\x19Ethereum Signed Message:\n" + len` convention
pub fn sign_personal_message(signer: &PrivateKeySigner, data: &[u8]) -> Result<Signature> {
    signer.sign_message_sync(data).map_err(|e| ProviderError::Signing(e.to_string()))
}

/// 65-byte `r || s || v` hex encoding with `v` in {27, 28}
pub fn to_rpc_signature(signature: &Signature) -> String {
    format!("0x{}", hex::encode(signature.as_bytes()))
}

/// Recover the address that produced a personal message signature
pub fn recover_personal_signer(data: &[u8], signature: &str) -> Result<Address> {
    let bytes = decode_hex(signature)
        .ok_or_else(|| ProviderError::InvalidParams("signature is not hex".to_string()))?;
    let signature = Signature::try_from(bytes.as_slice())
        .map_err(|e| ProviderError::InvalidParams(format!("invalid signature: {}", e)))?;
    signature.recover_address_from_msg(data).map_err(|e| ProviderError::Signing(e.to_string()))
}

/// Bytes to sign for a message payload.
///
/// `0x` prefixed hex is decoded, with an odd digit count zero-padded on the
/// left; anything else is taken as UTF-8 text.
pub fn message_bytes(data: &str) -> Vec<u8> {
    if data.starts_with("0x") {
        if let Some(bytes) = decode_hex(data) {
            return bytes;
        }
    }
    data.as_bytes().to_vec()
}

fn decode_hex(value: &str) -> Option<Vec<u8>> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    if stripped.len() % 2 == 1 {
        hex::decode(format!("0{}", stripped)).ok()
    } else {
        hex::decode(stripped).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const SENDER: Address = address!("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");

    fn signer() -> PrivateKeySigner {
        KEY.parse().unwrap()
    }

    fn legacy_request() -> TransactionRequest {
        serde_json::from_value(serde_json::json!({
            "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "to": "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
            "value": "0xde0b6b3a7640000",
            "gas": "0x5208",
            "gasPrice": "0x3b9aca00",
            "nonce": "0x7",
            "chainId": "0x539"
        }))
        .unwrap()
    }

    #[test]
    fn test_legacy_round_trip_recovers_sender() {
        let raw = sign_transaction(&signer(), &legacy_request(), None).unwrap();
        let (sender, nonce) = recover_raw_transaction(&raw).unwrap();

        assert_eq!(sender, SENDER);
        assert_eq!(nonce, 7);
    }

    #[test]
    fn test_legacy_uses_eip155_when_chain_known() {
        let tx = UnsignedTransaction::from_request(&legacy_request(), None).unwrap();
        match tx {
            UnsignedTransaction::Legacy(tx) => assert_eq!(tx.chain_id, Some(1337)),
            other => panic!("expected legacy transaction, got {:?}", other),
        }

        let mut request = legacy_request();
        request.chain_id = None;
        match UnsignedTransaction::from_request(&request, Some(5)).unwrap() {
            UnsignedTransaction::Legacy(tx) => assert_eq!(tx.chain_id, Some(5)),
            other => panic!("expected legacy transaction, got {:?}", other),
        }
    }

    #[test]
    fn test_dynamic_fee_round_trip() {
        let request: TransactionRequest = serde_json::from_value(serde_json::json!({
            "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "to": "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
            "gas": "0x5208",
            "maxFeePerGas": "0x77359400",
            "maxPriorityFeePerGas": "0x3b9aca00",
            "nonce": "0x0",
            "chainId": "0x1"
        }))
        .unwrap();

        let raw = sign_transaction(&signer(), &request, None).unwrap();
        assert_eq!(raw[0], 0x02);
        assert_eq!(recover_raw_transaction(&raw).unwrap(), (SENDER, 0));
    }

    #[test]
    fn test_dynamic_fee_without_chain_id_is_rejected() {
        let mut request = legacy_request();
        request.chain_id = None;
        request.max_fee_per_gas = Some(1);
        assert!(matches!(
            UnsignedTransaction::from_request(&request, None),
            Err(ProviderError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let first = sign_personal_message(&signer(), b"hello").unwrap();
        let second = sign_personal_message(&signer(), b"hello").unwrap();
        assert_eq!(first, second);
        assert_eq!(to_rpc_signature(&first).len(), 2 + 130);
    }

    #[test]
    fn test_personal_signature_recovers_signer() {
        let signature = to_rpc_signature(&sign_personal_message(&signer(), b"hello").unwrap());
        assert_eq!(recover_personal_signer(b"hello", &signature).unwrap(), SENDER);
        assert_ne!(recover_personal_signer(b"hullo", &signature).unwrap(), SENDER);
    }

    #[test]
    fn test_message_bytes_decodes_hex_only_when_valid() {
        assert_eq!(message_bytes("0x68656c6c6f"), b"hello".to_vec());
        assert_eq!(message_bytes("hello"), b"hello".to_vec());
        assert_eq!(message_bytes("0xzz"), b"0xzz".to_vec());
    }

    #[test]
    fn test_message_bytes_pads_odd_hex() {
        assert_eq!(message_bytes("0xabc"), vec![0x0a, 0xbc]);
        assert_eq!(message_bytes("0x1"), vec![0x01]);
        assert_eq!(message_bytes("0xabz"), b"0xabz".to_vec());

        let signature = sign_personal_message(&signer(), &message_bytes("0xabc")).unwrap();
        let recovered =
            recover_personal_signer(&[0x0a, 0xbc], &to_rpc_signature(&signature)).unwrap();
        assert_eq!(recovered, SENDER);
    }
}
