use crate::{
    provider::Result,
    wallet::{DEFAULT_HD_PATH, DerivationConfig},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Construction options for [`HdWalletProvider`](super::HdWalletProvider)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOptions {
    /// First derivation index, or first position in a private key list
    pub address_index: u32,
    /// Number of accounts to derive
    pub num_addresses: u32,
    /// Use the process-wide nonce coordinator instead of a private one
    #[serde(alias = "shareNonce")]
    pub share_nonce: bool,
    /// Derivation path prefix the index is appended to
    pub wallet_hdpath: String,
    /// Extra headers sent with every HTTP request
    pub headers: HashMap<String, String>,
    /// Chain id used for replay protection when a transaction carries none
    pub chain_id: Option<u64>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            address_index: 0,
            num_addresses: 1,
            share_nonce: true,
            wallet_hdpath: DEFAULT_HD_PATH.to_string(),
            headers: HashMap::new(),
            chain_id: None,
        }
    }
}

impl ProviderOptions {
    /// Derivation settings these options describe
    pub fn derivation(&self) -> Result<DerivationConfig> {
        DerivationConfig::new(self.wallet_hdpath.clone(), self.address_index, self.num_addresses)
    }
}
