//! Configuration management for the command line tool
use crate::{provider::ProviderOptions, wallet::KeyMaterial};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};
use thiserror::Error;
use zeroize::Zeroize;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Key material for the provider. Exactly one of the two fields should be set.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    pub mnemonic: Option<String>,
    #[serde(default)]
    pub private_keys: Vec<String>,
}

impl fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConfig")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .field("private_keys", &format_args!("<{} redacted>", self.private_keys.len()))
            .finish()
    }
}

impl Drop for WalletConfig {
    fn drop(&mut self) {
        self.mnemonic.zeroize();
        self.private_keys.zeroize();
    }
}

/// Node the provider forwards unhandled requests to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { rpc_url: "http://127.0.0.1:8545".to_string() }
    }
}

/// Local JSON-RPC endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8546 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging format: "json" or "text"
    pub format: String,
    /// Default log level if no RUST_LOG is set
    pub default_level: String,
    /// Custom filter for dependency logs
    pub dependency_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            default_level: "info".to_string(),
            dependency_filter: Some(
                "hyper=warn,hyper_util=warn,h2=warn,tower=info,reqwest=warn,alloy_transport_http=warn"
                    .to_string(),
            ),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub provider: ProviderOptions,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv().ok();

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // HDWALLET_CONFIG names the TOML file; it is read before the remaining variables
        if let Some(config_path) = std::env::var_os("HDWALLET_CONFIG") {
            let path = Path::new(&config_path);
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            } else {
                return Err(ConfigError::LoadError(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
        }

        Self::from_figment(figment.merge(Env::prefixed("HDWALLET_").split("__")))
    }

    /// Extract a configuration from an already assembled figment
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_mnemonic = self.wallet.mnemonic.as_deref().is_some_and(|m| !m.trim().is_empty());
        let has_keys = !self.wallet.private_keys.is_empty();
        match (has_mnemonic, has_keys) {
            (false, false) => {
                return Err(ConfigError::MissingConfig(
                    "wallet.mnemonic or wallet.private_keys is required".to_string(),
                ));
            },
            (true, true) => {
                return Err(ConfigError::InvalidValue(
                    "set only one of wallet.mnemonic and wallet.private_keys".to_string(),
                ));
            },
            _ => {},
        }

        if self.network.rpc_url.is_empty() {
            return Err(ConfigError::MissingConfig("network.rpc_url is required".to_string()));
        }

        if self.provider.num_addresses == 0 {
            return Err(ConfigError::InvalidValue(
                "provider.num_addresses must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Key material to build the provider from
    pub fn key_material(&self) -> Result<KeyMaterial, ConfigError> {
        if let Some(mnemonic) = self.wallet.mnemonic.as_deref().filter(|m| !m.trim().is_empty()) {
            return Ok(KeyMaterial::Phrase(mnemonic.to_string()));
        }
        if !self.wallet.private_keys.is_empty() {
            return Ok(KeyMaterial::Keys(self.wallet.private_keys.clone()));
        }
        Err(ConfigError::MissingConfig("no wallet key material configured".to_string()))
    }
}
