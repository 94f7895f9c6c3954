//! Layers of the provider's middleware chain, head first:
//! signing, nonce tracking, then the network transport.

mod nonce_tracker;
mod signing;
mod transport;

pub use nonce_tracker::NonceTracker;
pub use signing::{MessageParams, SigningMiddleware};
pub use transport::TransportSubprovider;
