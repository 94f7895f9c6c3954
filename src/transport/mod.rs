//! Network transports the chain's terminal layer dispatches to.

mod http;
mod provider;

pub use http::HttpTransport;
pub use provider::ProviderTransport;

use crate::provider::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};

/// Anything that can carry a JSON-RPC call to a node
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `method` with `params` and return the `result` member of the response
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError>;
}

/// Where requests the provider does not answer itself are sent
#[derive(Clone)]
pub enum Destination {
    /// HTTP(S) endpoint URL
    Url(String),
    /// An already constructed transport, used as is
    Transport(Arc<dyn Transport>),
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Destination::Transport(_) => f.write_str("Transport(..)"),
        }
    }
}

impl From<&str> for Destination {
    fn from(url: &str) -> Self {
        Destination::Url(url.to_string())
    }
}

impl From<String> for Destination {
    fn from(url: String) -> Self {
        Destination::Url(url)
    }
}

impl From<Arc<dyn Transport>> for Destination {
    fn from(transport: Arc<dyn Transport>) -> Self {
        Destination::Transport(transport)
    }
}

impl Destination {
    /// Wrap any transport implementation
    pub fn transport<T: Transport + 'static>(transport: T) -> Self {
        Destination::Transport(Arc::new(transport))
    }

    /// Resolve into a transport; URLs get an [`HttpTransport`] carrying `headers`
    pub fn into_transport(
        self,
        headers: &HashMap<String, String>,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        match self {
            Destination::Url(url) => Ok(Arc::new(HttpTransport::new(&url, headers)?)),
            Destination::Transport(transport) => Ok(transport),
        }
    }
}
