//! Address to keypair bindings produced by derivation.

use crate::{
    provider::{ProviderError, Result},
    wallet::format_address,
};
use alloy_primitives::Address;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use std::{collections::HashMap, fmt, str::FromStr};

/// A derived account: its address and the signer holding its private key.
#[derive(Clone)]
pub struct AddressBinding {
    address: Address,
    signer: PrivateKeySigner,
}

impl fmt::Debug for AddressBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressBinding").field("address", &self.address).finish_non_exhaustive()
    }
}

impl AddressBinding {
    /// Bind a signer to the address derived from its public key
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { address: signer.address(), signer }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// Hex encoded private key without a `0x` prefix
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signer.to_bytes())
    }
}

/// Ordered, deduplicated set of derived accounts.
///
/// Keys are typed addresses, so lookups ignore the letter case of the hex
/// string the caller supplies. Insertion order is derivation order.
#[derive(Debug, Default, Clone)]
pub struct WalletRegistry {
    bindings: Vec<AddressBinding>,
    positions: HashMap<Address, usize>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding. Returns false when the address is already present.
    pub(crate) fn insert(&mut self, binding: AddressBinding) -> bool {
        if self.positions.contains_key(&binding.address) {
            return false;
        }
        self.positions.insert(binding.address, self.bindings.len());
        self.bindings.push(binding);
        true
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.positions.contains_key(address)
    }

    /// Get the binding for an address
    pub fn get(&self, address: &Address) -> Option<&AddressBinding> {
        self.positions.get(address).map(|&position| &self.bindings[position])
    }

    /// Look up a binding from an address string in any letter case.
    pub fn lookup(&self, address: &str) -> Result<&AddressBinding> {
        let parsed = Address::from_str(address.trim())
            .map_err(|_| ProviderError::AccountNotFound(address.to_string()))?;
        self.get(&parsed).ok_or_else(|| ProviderError::AccountNotFound(address.to_string()))
    }

    /// All addresses in derivation order
    pub fn addresses(&self) -> Vec<Address> {
        self.bindings.iter().map(AddressBinding::address).collect()
    }

    /// All addresses in derivation order, rendered as lower-case `0x` hex
    pub fn address_strings(&self) -> Vec<String> {
        self.bindings.iter().map(|binding| format_address(&binding.address)).collect()
    }

    /// Address at a position in derivation order; `None` and `Some(0)` both mean the first.
    pub fn address(&self, index: Option<usize>) -> Option<Address> {
        self.bindings.get(index.unwrap_or(0)).map(AddressBinding::address)
    }

    /// Hex encoded private key for a registered address
    pub fn private_key(&self, address: &str) -> Result<String> {
        self.lookup(address).map(AddressBinding::private_key_hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_0: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const ADDRESS_0: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    const KEY_1: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn binding(key: &str) -> AddressBinding {
        AddressBinding::new(key.parse::<PrivateKeySigner>().unwrap())
    }

    #[test]
    fn test_insert_keeps_order_and_dedupes() {
        let mut registry = WalletRegistry::new();
        assert!(registry.insert(binding(KEY_0)));
        assert!(registry.insert(binding(KEY_1)));
        assert!(!registry.insert(binding(KEY_0)));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.address_strings()[0], ADDRESS_0);
        assert_eq!(registry.address(None), registry.address(Some(0)));
        assert_eq!(registry.address(Some(1)), Some(registry.addresses()[1]));
        assert_eq!(registry.address(Some(2)), None);
    }

    #[test]
    fn test_lookup_ignores_case() {
        let mut registry = WalletRegistry::new();
        registry.insert(binding(KEY_0));

        let checksummed = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
        assert_eq!(registry.private_key(checksummed).unwrap(), KEY_0);
        assert_eq!(registry.private_key(&ADDRESS_0.to_uppercase().replace("0X", "0x")).unwrap(), KEY_0);
    }

    #[test]
    fn test_unknown_address_is_account_not_found() {
        let mut registry = WalletRegistry::new();
        registry.insert(binding(KEY_0));

        let missing = "0x0000000000000000000000000000000000000001";
        assert!(matches!(registry.private_key(missing), Err(ProviderError::AccountNotFound(_))));
        assert!(matches!(registry.lookup("garbage"), Err(ProviderError::AccountNotFound(_))));
    }
}
