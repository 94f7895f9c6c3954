//! The HD wallet provider: derived accounts, local signing, and a transport
//! for everything else, assembled into one middleware chain.

mod error;
mod options;

pub use error::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, ProviderError,
    Result, SERVER_ERROR, TransportError,
};
pub use options::ProviderOptions;

use crate::{
    engine::{JsonRpcRequest, JsonRpcResponse, ProviderEngine, RequestPayload, ResponsePayload},
    nonce::NonceCoordinator,
    subproviders::{NonceTracker, SigningMiddleware, TransportSubprovider},
    transport::Destination,
    wallet::{AddressDeriver, KeyMaterial, KeySource, WalletRegistry},
};
use alloy_primitives::Address;
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, RuntimeFlavor};
use tracing::{info, warn};

/// Signs with locally derived accounts and forwards every other request.
///
/// Cloning is cheap; clones share the chain, the registry, and the nonce coordinator.
#[derive(Clone)]
pub struct HdWalletProvider {
    registry: Arc<WalletRegistry>,
    signing: Arc<SigningMiddleware>,
    engine: Arc<ProviderEngine>,
    nonces: Arc<NonceCoordinator>,
}

impl HdWalletProvider {
    /// Derive accounts from `material` and forward unhandled requests to `destination`
    pub fn new(
        material: impl Into<KeyMaterial>,
        destination: impl Into<Destination>,
        options: ProviderOptions,
    ) -> Result<Self> {
        Self::builder(material, destination).options(options).build()
    }

    pub fn builder(
        material: impl Into<KeyMaterial>,
        destination: impl Into<Destination>,
    ) -> HdWalletProviderBuilder {
        HdWalletProviderBuilder {
            material: material.into(),
            destination: destination.into(),
            options: ProviderOptions::default(),
            nonces: None,
        }
    }

    /// Address at `index` in derivation order; `None` or `0` gives the first
    pub fn get_address(&self, index: Option<usize>) -> Option<Address> {
        self.registry.address(index)
    }

    /// All derived addresses in derivation order
    pub fn get_addresses(&self) -> Vec<Address> {
        self.registry.addresses()
    }

    pub fn registry(&self) -> &WalletRegistry {
        &self.registry
    }

    /// The signing layer, for signing without going through JSON-RPC
    pub fn signer(&self) -> &SigningMiddleware {
        &self.signing
    }

    pub fn nonce_coordinator(&self) -> &Arc<NonceCoordinator> {
        &self.nonces
    }

    /// Names of the chain's layers, head first
    pub fn layers(&self) -> Vec<&'static str> {
        self.engine.layer_names()
    }

    /// Run a request through the chain and return its result
    pub async fn dispatch(&self, request: JsonRpcRequest) -> Result<Value> {
        self.engine.dispatch(request).await
    }

    /// Run a request and wrap the outcome in a JSON-RPC response
    pub async fn request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        self.engine.respond(request).await
    }

    /// Run a single request or a batch
    pub async fn request_payload(&self, payload: RequestPayload) -> ResponsePayload {
        self.engine.respond_payload(payload).await
    }

    /// Run a request on a spawned task and hand the outcome to `callback`.
    ///
    /// Chain failures arrive as `Err`; without a tokio runtime the callback is
    /// invoked immediately with [`ProviderError::UnsupportedMethod`].
    pub fn send_async<F>(&self, request: JsonRpcRequest, callback: F)
    where
        F: FnOnce(Result<JsonRpcResponse>) + Send + 'static,
    {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                callback(Err(ProviderError::UnsupportedMethod(
                    "send_async requires a tokio runtime".to_string(),
                )));
                return;
            },
        };

        let engine = Arc::clone(&self.engine);
        handle.spawn(async move {
            let id = request.id.clone();
            let outcome = engine.dispatch(request).await.map(|result| JsonRpcResponse::success(id, result));
            callback(outcome);
        });
    }

    /// Blocking variant of [`request_payload`](Self::request_payload).
    ///
    /// Works outside a runtime and inside a multi-thread runtime. A
    /// current-thread runtime cannot be blocked, so the call fails there.
    pub fn send(&self, payload: RequestPayload) -> Result<ResponsePayload> {
        match Handle::try_current() {
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::MultiThread => Ok(tokio::task::block_in_place(|| {
                    handle.block_on(self.request_payload(payload))
                })),
                _ => Err(ProviderError::UnsupportedMethod(
                    "send cannot block a current-thread runtime, use request instead".to_string(),
                )),
            },
            Err(_) => {
                let runtime = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| ProviderError::Config(format!("failed to start runtime: {}", e)))?;
                Ok(runtime.block_on(self.request_payload(payload)))
            },
        }
    }
}

impl std::fmt::Debug for HdWalletProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HdWalletProvider")
            .field("addresses", &self.registry.address_strings())
            .field("layers", &self.engine.layer_names())
            .finish()
    }
}

/// Builder for [`HdWalletProvider`]
pub struct HdWalletProviderBuilder {
    material: KeyMaterial,
    destination: Destination,
    options: ProviderOptions,
    nonces: Option<Arc<NonceCoordinator>>,
}

impl HdWalletProviderBuilder {
    pub fn options(mut self, options: ProviderOptions) -> Self {
        self.options = options;
        self
    }

    /// Use this coordinator regardless of `share_nonce`
    pub fn nonce_coordinator(mut self, nonces: Arc<NonceCoordinator>) -> Self {
        self.nonces = Some(nonces);
        self
    }

    pub fn build(self) -> Result<HdWalletProvider> {
        let Self { material, destination, options, nonces } = self;

        let derivation = options.derivation()?;
        let source = KeySource::normalize(material)?;
        let registry = Arc::new(AddressDeriver::new(derivation).derive(&source)?);
        if registry.is_empty() {
            warn!("No usable accounts were derived");
        }

        let transport = destination.into_transport(&options.headers)?;
        let nonces = nonces.unwrap_or_else(|| {
            if options.share_nonce { NonceCoordinator::global() } else { Arc::new(NonceCoordinator::new()) }
        });

        let signing = Arc::new(
            SigningMiddleware::new(Arc::clone(&registry), options.chain_id)
                .with_nonce_coordinator(Arc::clone(&nonces)),
        );

        let mut engine = ProviderEngine::new();
        engine
            .add_provider(signing.clone())
            .add_provider(Arc::new(NonceTracker::new(Arc::clone(&nonces))))
            .add_provider(Arc::new(TransportSubprovider::new(transport)));

        info!(
            accounts = registry.len(),
            mnemonic = source.is_mnemonic(),
            share_nonce = options.share_nonce,
            "HD wallet provider ready"
        );

        Ok(HdWalletProvider { registry, signing, engine: Arc::new(engine), nonces })
    }
}
