//! x402 Protocol data types

use serde::{Deserialize, Serialize};

/// USDC contract address on Base mainnet
pub const USDC_ADDRESS: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

/// Base mainnet chain ID
pub const BASE_CHAIN_ID: u64 = 8453;

/// Base Sepolia chain ID
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;

/// The only payment scheme the local signer can satisfy
pub const EXACT_SCHEME: &str = "exact";

/// Wire dialect of the payment handshake.
///
/// `V2` carries requirements in the base64 `PAYMENT-REQUIRED` response header
/// and answers with `PAYMENT-SIGNATURE`. `V1` (legacy) carries them in the 402
/// JSON body and answers with `X-PAYMENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProtocol {
    V2,
    V1,
}

impl PaymentProtocol {
    pub fn from_name(name: &str) -> Result<Self, String> {
        match name.trim().to_lowercase().as_str() {
            "v2" | "2" => Ok(Self::V2),
            "v1" | "1" | "legacy" => Ok(Self::V1),
            other => Err(format!(
                "Unknown x402 protocol '{}'. Use 'v2' or 'v1'.",
                other
            )),
        }
    }

    pub fn version(self) -> u8 {
        match self {
            Self::V2 => 2,
            Self::V1 => 1,
        }
    }

    /// Request header that carries the signed payment
    pub fn payment_header(self) -> &'static str {
        match self {
            Self::V2 => "PAYMENT-SIGNATURE",
            Self::V1 => "X-PAYMENT",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::V2 => "v2",
            Self::V1 => "v1",
        }
    }
}

/// Payment requirements returned by server in 402 response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    pub x402_version: u8,
    pub accepts: Vec<PaymentRequirements>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    #[serde(alias = "amount")]
    pub max_amount_required: String,
    #[serde(alias = "payTo")]
    pub pay_to_address: String,
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub max_timeout_seconds: u64,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub extra: Option<AssetExtra>,
}

/// EIP-712 domain hints for the payment token
#[derive(Debug, Clone, Deserialize)]
pub struct AssetExtra {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl PaymentRequirements {
    /// Token contract to pay with; USDC on Base when the server leaves it out
    pub fn asset_address(&self) -> &str {
        if self.asset.is_empty() {
            USDC_ADDRESS
        } else {
            &self.asset
        }
    }

    /// EVM chain id for the requirement's network identifier
    pub fn chain_id(&self) -> Result<u64, String> {
        match self.network.as_str() {
            "base" => Ok(BASE_CHAIN_ID),
            "base-sepolia" => Ok(BASE_SEPOLIA_CHAIN_ID),
            other => other
                .strip_prefix("eip155:")
                .and_then(|id| id.parse().ok())
                .ok_or_else(|| format!("Unsupported payment network: {}", other)),
        }
    }
}

impl PaymentRequired {
    /// Decode payment requirements from base64 PAYMENT-REQUIRED header
    pub fn from_base64(encoded: &str) -> Result<Self, String> {
        let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
            .map_err(|e| format!("Failed to decode payment required header: {}", e))?;
        let json = String::from_utf8(decoded)
            .map_err(|e| format!("Invalid UTF-8 in payment required header: {}", e))?;
        serde_json::from_str(&json)
            .map_err(|e| format!("Failed to parse payment required: {}", e))
    }

    /// Pick the option the local signer can pay: the first `exact` one
    pub fn select_exact(&self) -> Result<&PaymentRequirements, String> {
        if self.accepts.is_empty() {
            return Err("No payment options in 402 response".to_string());
        }
        self.accepts
            .iter()
            .find(|r| r.scheme == EXACT_SCHEME)
            .ok_or_else(|| {
                let offered: Vec<&str> = self.accepts.iter().map(|r| r.scheme.as_str()).collect();
                format!("No supported payment scheme offered (got: {})", offered.join(", "))
            })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedPayment {
    pub scheme: String,
    pub network: String,
    pub amount: String,
    pub pay_to: String,
    pub max_timeout_seconds: u64,
    pub asset: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmPayload {
    pub signature: String,
    pub authorization: Eip3009Authorization,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip3009Authorization {
    pub from: String,
    pub to: String,
    pub value: String,
    pub valid_after: String,
    pub valid_before: String,
    pub nonce: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayloadV2 {
    pub x402_version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub accepted: AcceptedPayment,
    pub payload: ExactEvmPayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayloadV1 {
    pub x402_version: u8,
    pub scheme: String,
    pub network: String,
    pub payload: ExactEvmPayload,
}

/// Payment payload sent to server in the protocol's payment header
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PaymentPayload {
    V2(PaymentPayloadV2),
    V1(PaymentPayloadV1),
}

impl PaymentPayload {
    /// Wrap a signed authorization in the envelope of the given dialect
    pub fn build(
        protocol: PaymentProtocol,
        requirements: &PaymentRequirements,
        signed: ExactEvmPayload,
    ) -> Self {
        match protocol {
            PaymentProtocol::V2 => Self::V2(PaymentPayloadV2 {
                x402_version: protocol.version(),
                resource: requirements.resource.clone(),
                accepted: AcceptedPayment {
                    scheme: requirements.scheme.clone(),
                    network: requirements.network.clone(),
                    amount: requirements.max_amount_required.clone(),
                    pay_to: requirements.pay_to_address.clone(),
                    max_timeout_seconds: requirements.max_timeout_seconds.max(60),
                    asset: requirements.asset_address().to_string(),
                },
                payload: signed,
            }),
            PaymentProtocol::V1 => Self::V1(PaymentPayloadV1 {
                x402_version: protocol.version(),
                scheme: requirements.scheme.clone(),
                network: requirements.network.clone(),
                payload: signed,
            }),
        }
    }

    /// Encode payment payload to base64 for the payment header
    pub fn to_base64(&self) -> Result<String, String> {
        let json = serde_json::to_string(self)
            .map_err(|e| format!("Failed to serialize payment payload: {}", e))?;
        Ok(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, json))
    }
}
