//! Error types for the signing provider.

use serde_json::Value;
use thiserror::Error;

/// JSON-RPC error code for request bodies that are not valid JSON-RPC.
pub const PARSE_ERROR: i64 = -32700;
/// JSON-RPC error code for JSON that is not a request object or batch.
pub const INVALID_REQUEST: i64 = -32600;
/// JSON-RPC error code for malformed or unusable parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC error code for methods nothing in the chain can answer.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC error code for failures inside the provider itself.
pub const INTERNAL_ERROR: i64 = -32603;
/// Generic server error code used for signing and configuration failures.
pub const SERVER_ERROR: i64 = -32000;

/// Errors that can occur while deriving accounts, signing, or dispatching requests.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The key material is neither a usable mnemonic nor a private key list
    #[error("Invalid key source: expected a mnemonic phrase or private key list")]
    InvalidKeySource,

    /// The mnemonic failed word-list or checksum validation
    #[error("Mnemonic invalid or undefined: {0}")]
    InvalidMnemonic(String),

    /// The requested address was never derived by this provider
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// A message signing request carried no payload
    #[error("No data to sign")]
    NoDataToSign,

    /// Request parameters could not be interpreted
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// The request cannot be served in the current context
    #[error("Unsupported: {0}")]
    UnsupportedMethod(String),

    /// Signing or recovery failed
    #[error("Signing error: {0}")]
    Signing(String),

    /// Invalid provider configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error reported by the underlying transport
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ProviderError {
    /// JSON-RPC error code this error is reported with.
    pub fn code(&self) -> i64 {
        match self {
            ProviderError::AccountNotFound(_)
            | ProviderError::NoDataToSign
            | ProviderError::InvalidParams(_) => INVALID_PARAMS,
            ProviderError::UnsupportedMethod(_) => METHOD_NOT_FOUND,
            ProviderError::Transport(TransportError::Rpc { code, .. }) => *code,
            ProviderError::Transport(_) => INTERNAL_ERROR,
            ProviderError::InvalidKeySource
            | ProviderError::InvalidMnemonic(_)
            | ProviderError::Signing(_)
            | ProviderError::Config(_) => SERVER_ERROR,
        }
    }

    /// Message placed in the JSON-RPC error object.
    ///
    /// Errors relayed from the node keep the node's own message untouched.
    pub fn rpc_message(&self) -> String {
        match self {
            ProviderError::Transport(TransportError::Rpc { message, .. }) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Optional `data` member of the JSON-RPC error object.
    pub fn rpc_data(&self) -> Option<Value> {
        match self {
            ProviderError::Transport(TransportError::Rpc { data, .. }) => data.clone(),
            _ => None,
        }
    }
}

/// Errors raised while talking to the network.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint could not be reached or answered with a non-success status
    #[error("HTTP error: {0}")]
    Http(String),

    /// The node answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// Error code reported by the node
        code: i64,
        /// Error message reported by the node
        message: String,
        /// Additional error data, if any
        data: Option<Value>,
    },

    /// The node answered with something that is not a JSON-RPC response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The endpoint URL is malformed
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;
