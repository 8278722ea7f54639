//! x402 Protocol implementation for paid API endpoints
//!
//! This module handles the x402 payment protocol flow:
//! 1. Make initial request
//! 2. If 402 returned, parse payment requirements
//! 3. Sign EIP-3009 authorization with the configured wallet
//! 4. Retry with the protocol's payment header

mod types;
mod client;
mod signer;

pub use types::*;
pub use client::X402Client;
pub use signer::{LocalWalletSigner, PaymentSigner};

use std::sync::Arc;

/// Build the payment-aware client for the configured key and protocol.
///
/// The dialect is chosen here, once; a failed handshake never retries in the
/// other dialect.
pub fn create_payment_client(
    private_key: &str,
    protocol: PaymentProtocol,
) -> Result<X402Client, String> {
    let signer = LocalWalletSigner::new(private_key)?;
    Ok(X402Client::new(
        crate::http::shared_client().clone(),
        Arc::new(signer),
        protocol,
    ))
}
