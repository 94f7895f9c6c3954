//! Deterministic derivation of accounts from a key source.

use crate::{
    provider::{ProviderError, Result},
    wallet::{
        key_source::KeySource,
        keystore::SecureMnemonic,
        registry::{AddressBinding, WalletRegistry},
    },
};
use alloy_signer_local::PrivateKeySigner;
use coins_bip32::prelude::{Parent, SigningKey};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Default BIP44 prefix for Ethereum accounts; the account index is appended.
pub const DEFAULT_HD_PATH: &str = "m/44'/60'/0'/0/";

/// Which accounts to derive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationConfig {
    /// Path the index is appended to, e.g. `m/44'/60'/0'/0/`
    pub path_prefix: String,
    /// First index to derive
    pub start_index: u32,
    /// Number of indices to derive, at least one
    pub count: u32,
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self { path_prefix: DEFAULT_HD_PATH.to_string(), start_index: 0, count: 1 }
    }
}

impl DerivationConfig {
    pub fn new(path_prefix: impl Into<String>, start_index: u32, count: u32) -> Result<Self> {
        let config = Self { path_prefix: path_prefix.into(), start_index, count };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(ProviderError::Config("num_addresses must be at least 1".to_string()));
        }
        if self.path_prefix.is_empty() {
            return Err(ProviderError::Config("wallet_hdpath must not be empty".to_string()));
        }
        Ok(())
    }

    /// Indices `[start_index, start_index + count)`
    pub fn indices(&self) -> Range<u32> {
        self.start_index..self.start_index.saturating_add(self.count)
    }

    /// Full derivation path for an index
    pub fn path(&self, index: u32) -> String {
        format!("{}{}", self.path_prefix, index)
    }
}

/// Produces a [`WalletRegistry`] from a [`KeySource`].
#[derive(Debug, Clone)]
pub struct AddressDeriver {
    config: DerivationConfig,
}

impl AddressDeriver {
    pub fn new(config: DerivationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DerivationConfig {
        &self.config
    }

    /// Derive every configured account.
    ///
    /// An invalid mnemonic fails the whole derivation. Malformed raw keys are
    /// skipped, so the registry may hold fewer accounts than requested.
    pub fn derive(&self, source: &KeySource) -> Result<WalletRegistry> {
        self.config.validate()?;

        let mut registry = WalletRegistry::new();
        match source {
            KeySource::Mnemonic(mnemonic) => self.derive_from_mnemonic(mnemonic, &mut registry)?,
            KeySource::RawKeys(keys) => self.derive_from_keys(keys, &mut registry),
        }

        Ok(registry)
    }

    fn derive_from_mnemonic(
        &self,
        mnemonic: &SecureMnemonic,
        registry: &mut WalletRegistry,
    ) -> Result<()> {
        let master = mnemonic.master_key()?;

        for index in self.config.indices() {
            let path = self.config.path(index);
            let child = master
                .derive_path(path.as_str())
                .map_err(|e| ProviderError::Config(format!("Invalid derivation path {}: {}", path, e)))?;
            let key: &SigningKey = child.as_ref();
            let signer = PrivateKeySigner::from_signing_key(key.clone());

            let binding = AddressBinding::new(signer);
            debug!(path = %path, address = %binding.address(), "Derived account");
            registry.insert(binding);
        }

        Ok(())
    }

    fn derive_from_keys(&self, keys: &[Zeroizing<String>], registry: &mut WalletRegistry) {
        for index in self.config.indices() {
            let Some(key) = keys.get(index as usize) else {
                debug!(index, "No private key at index, skipping");
                continue;
            };

            match parse_private_key(key) {
                Some(signer) => {
                    registry.insert(AddressBinding::new(signer));
                },
                None => debug!(index, "Skipping malformed private key"),
            }
        }

        if registry.len() < self.config.count as usize {
            warn!(
                requested = self.config.count,
                registered = registry.len(),
                "Some private keys were skipped; fewer accounts than requested"
            );
        }
    }
}

/// Parse a hex private key, `0x` prefix optional.
///
/// Returns `None` unless the key is 32 bytes and a valid secp256k1 scalar.
pub fn parse_private_key(key: &str) -> Option<PrivateKeySigner> {
    let trimmed = key.trim();
    let hex_key = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = Zeroizing::new(hex::decode(hex_key).ok()?);
    PrivateKeySigner::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::format_address;

    const HARDHAT_MNEMONIC: &str = "test test test test test test test test test test test junk";
    const TRUFFLE_MNEMONIC: &str =
        "myth like bonus scare over problem client lizard pioneer submit female collect";

    #[test]
    fn test_hardhat_vectors() {
        let source = KeySource::normalize(HARDHAT_MNEMONIC).unwrap();
        let deriver = AddressDeriver::new(DerivationConfig::new(DEFAULT_HD_PATH, 0, 2).unwrap());
        let registry = deriver.derive(&source).unwrap();

        assert_eq!(
            registry.address_strings(),
            vec![
                "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string(),
                "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".to_string(),
            ]
        );
        assert_eq!(
            registry.private_key("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap(),
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
        );
    }

    #[test]
    fn test_shared_root_matches_per_path_derivation() {
        use alloy_signer_local::MnemonicBuilder;
        use coins_bip39::English;

        let source = KeySource::normalize(HARDHAT_MNEMONIC).unwrap();
        let registry = AddressDeriver::new(DerivationConfig::new(DEFAULT_HD_PATH, 0, 4).unwrap())
            .derive(&source)
            .unwrap();

        let expected: Vec<_> = (0..4)
            .map(|index| {
                MnemonicBuilder::<English>::default()
                    .phrase(HARDHAT_MNEMONIC)
                    .derivation_path(format!("{}{}", DEFAULT_HD_PATH, index))
                    .unwrap()
                    .build()
                    .unwrap()
                    .address()
            })
            .collect();
        assert_eq!(registry.addresses(), expected);
    }

    #[test]
    fn test_truffle_vector() {
        let source = KeySource::normalize(TRUFFLE_MNEMONIC).unwrap();
        let registry = AddressDeriver::new(DerivationConfig::default()).derive(&source).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(
            format_address(&registry.addresses()[0]),
            "0x627306090abab3a6e1400e9345bc60c78a8bef57"
        );
        assert_eq!(
            registry.private_key("0x627306090abaB3A6e1400e9345bC60c78a8BEf57").unwrap(),
            "c87509a1c067bbde78beb793e6fa76530b6382a4c0241e5e4a9ec0a0f44dc0d3"
        );
    }

    #[test]
    fn test_start_index_offsets_derivation() {
        let source = KeySource::normalize(HARDHAT_MNEMONIC).unwrap();
        let registry = AddressDeriver::new(DerivationConfig::new(DEFAULT_HD_PATH, 1, 1).unwrap())
            .derive(&source)
            .unwrap();

        assert_eq!(registry.address_strings(), vec!["0x70997970c51812dc3a010c7d01b50e0d17dc79c8"]);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let config = DerivationConfig::new(DEFAULT_HD_PATH, 0, 3).unwrap();
        let first = AddressDeriver::new(config.clone())
            .derive(&KeySource::normalize(TRUFFLE_MNEMONIC).unwrap())
            .unwrap();
        let second = AddressDeriver::new(config)
            .derive(&KeySource::normalize(TRUFFLE_MNEMONIC).unwrap())
            .unwrap();

        assert_eq!(first.addresses(), second.addresses());
        for address in first.address_strings() {
            assert_eq!(first.private_key(&address).unwrap(), second.private_key(&address).unwrap());
        }
    }

    #[test]
    fn test_invalid_mnemonic_fails() {
        let source = KeySource::normalize(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon",
        )
        .unwrap();
        let result = AddressDeriver::new(DerivationConfig::default()).derive(&source);
        assert!(matches!(result, Err(ProviderError::InvalidMnemonic(_))));
    }

    #[test]
    fn test_malformed_keys_are_skipped_in_order() {
        let source = KeySource::normalize(vec![
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            "0xnothex",
            "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
        ])
        .unwrap();
        let registry = AddressDeriver::new(DerivationConfig::new(DEFAULT_HD_PATH, 0, 3).unwrap())
            .derive(&source)
            .unwrap();

        assert_eq!(
            registry.address_strings(),
            vec![
                "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string(),
                "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".to_string(),
            ]
        );
    }

    #[test]
    fn test_indices_past_key_list_are_skipped() {
        let source = KeySource::normalize(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let registry = AddressDeriver::new(DerivationConfig::new(DEFAULT_HD_PATH, 0, 4).unwrap())
            .derive(&source)
            .unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_parse_private_key_rejects_out_of_range() {
        assert!(parse_private_key(&"00".repeat(32)).is_none());
        assert!(parse_private_key(&"ff".repeat(32)).is_none());
        assert!(parse_private_key("0x1234").is_none());
        assert!(parse_private_key(&format!("0x{}", "11".repeat(32))).is_some());
    }

    #[test]
    fn test_zero_count_is_rejected() {
        assert!(DerivationConfig::new(DEFAULT_HD_PATH, 0, 0).is_err());
    }
}
