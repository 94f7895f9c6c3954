//! hdwallet-provider - HD wallet signing provider for Ethereum JSON-RPC
//!
//! Derives accounts from a BIP39 mnemonic or a list of private keys, answers
//! account and signing requests locally, and forwards every other request to
//! a node through an ordered middleware chain.

pub mod config;
pub mod engine;
pub mod error;
pub mod nonce;
pub mod provider;
pub mod server;
pub mod subproviders;
pub mod transport;
pub mod wallet;

pub use provider::{HdWalletProvider, ProviderError, ProviderOptions};
pub use transport::{Destination, Transport};
