//! Nonce state shared between provider instances.
//!
//! Tools that rebuild the provider for every transaction lose any
//! per-instance nonce cache, so by default every provider in the process
//! shares [`NonceCoordinator::global`]. A provider built with
//! `share_nonce = false` gets a private coordinator instead, and tests can
//! inject their own.

use alloy_primitives::Address;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

static GLOBAL_COORDINATOR: Lazy<Arc<NonceCoordinator>> =
    Lazy::new(|| Arc::new(NonceCoordinator::new()));

/// Per-account next-nonce cache plus per-account send locks
#[derive(Debug, Default)]
pub struct NonceCoordinator {
    next_nonces: DashMap<Address, u64>,
    send_locks: DashMap<Address, Arc<Mutex<()>>>,
}

impl NonceCoordinator {
    /// Create an isolated coordinator
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide coordinator, created on first use
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_COORDINATOR)
    }

    /// Next nonce for an account, if one has been observed
    pub fn cached(&self, address: &Address) -> Option<u64> {
        self.next_nonces.get(address).map(|entry| *entry)
    }

    /// Record the network's pending count unless a value is already cached.
    ///
    /// Returns the value now cached.
    pub fn seed(&self, address: Address, nonce: u64) -> u64 {
        *self.next_nonces.entry(address).or_insert(nonce)
    }

    /// Record that a transaction with `nonce` was accepted.
    ///
    /// The cached next nonce never moves backwards. Returns the value now cached.
    pub fn record_sent(&self, address: Address, nonce: u64) -> u64 {
        let next = nonce.saturating_add(1);
        let mut entry = self.next_nonces.entry(address).or_insert(next);
        if *entry < next {
            *entry = next;
        }
        debug!(address = %address, next_nonce = *entry, "Recorded sent transaction");
        *entry
    }

    /// Forget every cached nonce
    pub fn reset(&self) {
        self.next_nonces.clear();
    }

    /// Number of accounts with a cached nonce
    pub fn len(&self) -> usize {
        self.next_nonces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next_nonces.is_empty()
    }

    /// Serialise nonce assignment for one account until the guard drops
    pub async fn lock_account(&self, address: Address) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.send_locks.entry(address).or_default().value());
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use std::time::Duration;

    const ACCOUNT: Address = address!("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");

    #[test]
    fn test_seed_only_when_absent() {
        let nonces = NonceCoordinator::new();
        assert_eq!(nonces.cached(&ACCOUNT), None);
        assert_eq!(nonces.seed(ACCOUNT, 4), 4);
        assert_eq!(nonces.seed(ACCOUNT, 1), 4);
        assert_eq!(nonces.cached(&ACCOUNT), Some(4));
    }

    #[test]
    fn test_record_sent_is_monotonic() {
        let nonces = NonceCoordinator::new();
        assert_eq!(nonces.record_sent(ACCOUNT, 5), 6);
        assert_eq!(nonces.record_sent(ACCOUNT, 2), 6);
        assert_eq!(nonces.record_sent(ACCOUNT, 6), 7);
    }

    #[test]
    fn test_reset_clears_cache() {
        let nonces = NonceCoordinator::new();
        nonces.record_sent(ACCOUNT, 0);
        assert_eq!(nonces.len(), 1);
        nonces.reset();
        assert!(nonces.is_empty());
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(&NonceCoordinator::global(), &NonceCoordinator::global()));
    }

    #[tokio::test]
    async fn test_account_lock_serialises_holders() {
        let nonces = Arc::new(NonceCoordinator::new());
        let guard = nonces.lock_account(ACCOUNT).await;

        let contender = {
            let nonces = Arc::clone(&nonces);
            tokio::spawn(async move {
                let _guard = nonces.lock_account(ACCOUNT).await;
                nonces.record_sent(ACCOUNT, 0)
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        assert_eq!(contender.await.unwrap(), 1);
    }
}
