//! Classification of constructor key material into a mnemonic or a private key list.

use crate::{
    provider::{ProviderError, Result},
    wallet::keystore::SecureMnemonic,
};
use std::fmt;
use zeroize::Zeroizing;

/// Key material exactly as handed to the provider constructor.
#[derive(Clone)]
pub enum KeyMaterial {
    /// A single string: either one private key or a whitespace separated mnemonic
    Phrase(String),
    /// An ordered list of hex private keys
    Keys(Vec<String>),
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Phrase(_) => f.write_str("KeyMaterial::Phrase(..)"),
            KeyMaterial::Keys(keys) => write!(f, "KeyMaterial::Keys(len = {})", keys.len()),
        }
    }
}

impl From<&str> for KeyMaterial {
    fn from(value: &str) -> Self {
        KeyMaterial::Phrase(value.to_string())
    }
}

impl From<String> for KeyMaterial {
    fn from(value: String) -> Self {
        KeyMaterial::Phrase(value)
    }
}

impl From<Vec<String>> for KeyMaterial {
    fn from(value: Vec<String>) -> Self {
        KeyMaterial::Keys(value)
    }
}

impl From<Vec<&str>> for KeyMaterial {
    fn from(value: Vec<&str>) -> Self {
        KeyMaterial::Keys(value.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for KeyMaterial {
    fn from(value: &[&str]) -> Self {
        KeyMaterial::Keys(value.iter().map(|key| key.to_string()).collect())
    }
}

/// Normalized key source the deriver works from.
#[derive(Clone)]
pub enum KeySource {
    /// BIP39 mnemonic phrase, not yet validated
    Mnemonic(SecureMnemonic),
    /// Hex encoded private keys, `0x` prefix optional, not yet validated
    RawKeys(Vec<Zeroizing<String>>),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Mnemonic(mnemonic) => f.debug_tuple("Mnemonic").field(mnemonic).finish(),
            KeySource::RawKeys(keys) => write!(f, "RawKeys(len = {})", keys.len()),
        }
    }
}

impl KeySource {
    /// Decide whether the material is a private key list or a mnemonic.
    ///
    /// A list is always treated as private keys. A string without whitespace is
    /// a single private key; a string with whitespace is a mnemonic phrase.
    pub fn normalize(material: impl Into<KeyMaterial>) -> Result<Self> {
        match material.into() {
            KeyMaterial::Keys(keys) => {
                if keys.is_empty() {
                    return Err(ProviderError::InvalidKeySource);
                }
                Ok(KeySource::RawKeys(keys.into_iter().map(Zeroizing::new).collect()))
            },
            KeyMaterial::Phrase(phrase) => {
                let phrase = Zeroizing::new(phrase);
                let trimmed = phrase.trim();
                if trimmed.is_empty() {
                    Err(ProviderError::InvalidKeySource)
                } else if trimmed.contains(char::is_whitespace) {
                    Ok(KeySource::Mnemonic(SecureMnemonic::new(trimmed)))
                } else {
                    Ok(KeySource::RawKeys(vec![Zeroizing::new(trimmed.to_string())]))
                }
            },
        }
    }

    /// Whether this source derives keys from a mnemonic
    pub fn is_mnemonic(&self) -> bool {
        matches!(self, KeySource::Mnemonic(_))
    }
}
