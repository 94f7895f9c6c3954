//! Key sources, account derivation, and local signing.

mod deriver;
mod key_source;
mod keystore;
mod registry;
mod signer;

pub use deriver::{AddressDeriver, DEFAULT_HD_PATH, DerivationConfig, parse_private_key};
pub use key_source::{KeyMaterial, KeySource};
pub use keystore::SecureMnemonic;
pub use registry::{AddressBinding, WalletRegistry};
pub use signer::{
    UnsignedTransaction, message_bytes, recover_personal_signer, recover_raw_transaction,
    sign_personal_message, sign_transaction, to_rpc_signature,
};

use alloy_primitives::Address;

/// Render an address as lower-case `0x` hex, the form returned over JSON-RPC
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}
