//! Secure in-memory storage for mnemonic phrases.

use crate::provider::{ProviderError, Result};
use coins_bip32::xkeys::XPriv;
use coins_bip39::{English, Mnemonic};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Mnemonic phrase wrapper that wipes the phrase from memory when dropped
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureMnemonic {
    /// The mnemonic phrase, words separated by single spaces
    phrase: String,
}

impl Zeroize for SecureMnemonic {
    fn zeroize(&mut self) {
        self.phrase.zeroize();
    }
}

impl fmt::Debug for SecureMnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureMnemonic").field("words", &self.word_count()).finish()
    }
}

impl SecureMnemonic {
    /// Create a new secure mnemonic, collapsing any run of whitespace into a single space
    pub fn new(phrase: &str) -> Self {
        Self { phrase: phrase.split_whitespace().collect::<Vec<_>>().join(" ") }
    }

    /// Get the mnemonic phrase
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Number of words in the phrase
    pub fn word_count(&self) -> usize {
        self.phrase.split(' ').filter(|word| !word.is_empty()).count()
    }

    /// Validate the phrase against the English word list and its checksum
    pub fn validate(&self) -> Result<()> {
        self.parse()?;
        Ok(())
    }

    /// Root extended key of the BIP39 seed (empty passphrase).
    ///
    /// Runs the PBKDF2 seed stretch, so callers deriving several accounts
    /// should derive every child from one root.
    pub fn master_key(&self) -> Result<XPriv> {
        self.parse()?.master_key(None).map_err(|e| ProviderError::InvalidMnemonic(e.to_string()))
    }

    fn parse(&self) -> Result<Mnemonic<English>> {
        Mnemonic::<English>::new_from_phrase(self.phrase())
            .map_err(|e| ProviderError::InvalidMnemonic(e.to_string()))
    }
}
