//! x402-aware HTTP client

use reqwest::{header, Client, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::signer::PaymentSigner;
use super::types::{PaymentPayload, PaymentProtocol, PaymentRequired};

/// Response header carrying the v2 payment requirements
const PAYMENT_REQUIRED_HEADER: &str = "payment-required";

/// HTTP client that automatically handles x402 payment flow
pub struct X402Client {
    client: Client,
    signer: Arc<dyn PaymentSigner>,
    protocol: PaymentProtocol,
}

impl X402Client {
    pub fn new(client: Client, signer: Arc<dyn PaymentSigner>, protocol: PaymentProtocol) -> Self {
        log::info!(
            "[X402] Initialized ({} protocol) with wallet address: {}",
            protocol.name(),
            signer.address()
        );

        Self {
            client,
            signer,
            protocol,
        }
    }

    /// Get the wallet address
    pub fn wallet_address(&self) -> String {
        self.signer.address()
    }

    /// Make a POST request with automatic x402 payment handling
    pub async fn post_with_payment<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<Response, String> {
        log::info!("[X402] Making request to {}", url);

        // First request without payment
        let initial_response = self.client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        if initial_response.status() != StatusCode::PAYMENT_REQUIRED {
            log::info!("[X402] No payment required, status: {}", initial_response.status());
            return Ok(initial_response);
        }

        log::info!("[X402] Received 402 Payment Required");

        let payment_required = self.read_requirements(initial_response).await?;
        if let Some(reason) = &payment_required.error {
            log::debug!("[X402] Server payment note: {}", reason);
        }

        let requirements = payment_required.select_exact()?;

        log::info!(
            "[X402] Payment requirements: {} {} to {} on {}",
            requirements.max_amount_required,
            requirements.asset_address(),
            requirements.pay_to_address,
            requirements.network
        );

        let signed = self.signer.sign_authorization(requirements).await?;
        let payment_header_value =
            PaymentPayload::build(self.protocol, requirements, signed).to_base64()?;

        log::info!(
            "[X402] Signed payment, retrying request with {} header",
            self.protocol.payment_header()
        );

        // Retry with payment
        let paid_response = self.client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(self.protocol.payment_header(), payment_header_value)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("Paid request failed: {}", e))?;

        log::info!("[X402] Payment sent, response status: {}", paid_response.status());

        Ok(paid_response)
    }

    /// Extract payment requirements from a 402 response in the configured dialect
    async fn read_requirements(&self, response: Response) -> Result<PaymentRequired, String> {
        match self.protocol {
            PaymentProtocol::V2 => {
                let encoded = response
                    .headers()
                    .get(PAYMENT_REQUIRED_HEADER)
                    .ok_or_else(|| "402 response missing payment-required header".to_string())?
                    .to_str()
                    .map_err(|e| format!("Invalid payment-required header: {}", e))?;
                PaymentRequired::from_base64(encoded)
            }
            PaymentProtocol::V1 => {
                let text = response
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read 402 body: {}", e))?;
                serde_json::from_str(&text)
                    .map_err(|e| format!("Failed to parse payment required body: {}", e))
            }
        }
    }
}
