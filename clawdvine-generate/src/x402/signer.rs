//! EIP-3009 signing for x402 payments

use async_trait::async_trait;
use ethers::core::k256::ecdsa::SigningKey;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;
use std::time::{SystemTime, UNIX_EPOCH};

use super::types::*;

/// Default EIP-712 domain of USDC, used when the server sends no `extra` hints
const USDC_DOMAIN_NAME: &str = "USD Coin";
const USDC_DOMAIN_VERSION: &str = "2";

/// Authorizations stay valid for one hour
const AUTHORIZATION_TTL_SECS: u64 = 3600;

/// Capability to authorize payments on behalf of a wallet
#[async_trait]
pub trait PaymentSigner: Send + Sync {
    /// Paying wallet address (lowercase hex)
    fn address(&self) -> String;

    /// Sign a `TransferWithAuthorization` satisfying the given requirements
    async fn sign_authorization(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<ExactEvmPayload, String>;
}

/// Payment signer backed by a local private key
pub struct LocalWalletSigner {
    wallet: LocalWallet,
}

impl LocalWalletSigner {
    /// Create a new signer from a private key (hex string with or without 0x prefix)
    pub fn new(private_key: &str) -> Result<Self, String> {
        let key_hex = private_key.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let key_bytes = hex::decode(key_hex)
            .map_err(|e| format!("Invalid private key hex: {}", e))?;
        if key_bytes.len() != 32 {
            return Err(format!(
                "Invalid private key: expected 32 bytes, got {}",
                key_bytes.len()
            ));
        }

        let signing_key = SigningKey::from_bytes(key_bytes.as_slice().into())
            .map_err(|e| format!("Invalid private key: {}", e))?;

        Ok(Self {
            wallet: LocalWallet::from(signing_key),
        })
    }

    /// Generate a cryptographically secure nonce
    fn generate_nonce() -> Result<H256, String> {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| format!("Failed to generate random bytes: {}", e))?;
        Ok(H256::from(keccak256(bytes)))
    }

    /// Sign the EIP-712 digest of a transfer authorization
    fn sign_typed_data(
        &self,
        domain: &Eip712Domain,
        message: &TransferWithAuthorizationMessage,
    ) -> Result<String, String> {
        let digest = typed_data_digest(domain, message);

        let signature = self.wallet
            .sign_hash(digest)
            .map_err(|e| format!("Failed to sign: {}", e))?;

        Ok(format!("0x{}", hex::encode(signature.to_vec())))
    }
}

#[async_trait]
impl PaymentSigner for LocalWalletSigner {
    fn address(&self) -> String {
        format!("{:?}", self.wallet.address()).to_lowercase()
    }

    async fn sign_authorization(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<ExactEvmPayload, String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| format!("Time error: {}", e))?;
        let valid_before = now.as_secs() + AUTHORIZATION_TTL_SECS;

        let nonce = Self::generate_nonce()?;

        let domain = Eip712Domain::for_requirements(requirements)?;
        let message = TransferWithAuthorizationMessage {
            from: self.wallet.address(),
            to: requirements.pay_to_address.parse()
                .map_err(|e| format!("Invalid pay_to_address: {}", e))?,
            value: U256::from_dec_str(&requirements.max_amount_required)
                .map_err(|e| format!("Invalid amount: {}", e))?,
            valid_after: U256::zero(),
            valid_before: U256::from(valid_before),
            nonce,
        };

        let signature = self.sign_typed_data(&domain, &message)?;

        log::debug!(
            "[X402] Signed authorization of {} to {} on chain {}",
            requirements.max_amount_required,
            requirements.pay_to_address,
            domain.chain_id
        );

        Ok(ExactEvmPayload {
            signature,
            authorization: Eip3009Authorization {
                from: self.address(),
                to: requirements.pay_to_address.to_lowercase(),
                value: requirements.max_amount_required.clone(),
                valid_after: "0".to_string(),
                valid_before: valid_before.to_string(),
                nonce: format!("{:?}", nonce),
            },
        })
    }
}

/// keccak256("\x19\x01" ++ domainSeparator ++ structHash)
fn typed_data_digest(domain: &Eip712Domain, message: &TransferWithAuthorizationMessage) -> H256 {
    let mut to_sign = Vec::with_capacity(66);
    to_sign.push(0x19);
    to_sign.push(0x01);
    to_sign.extend_from_slice(domain.separator().as_bytes());
    to_sign.extend_from_slice(message.struct_hash().as_bytes());
    H256::from(keccak256(&to_sign))
}

/// EIP-712 domain of the payment token
struct Eip712Domain {
    name: String,
    version: String,
    chain_id: u64,
    verifying_contract: Address,
}

impl Eip712Domain {
    fn for_requirements(requirements: &PaymentRequirements) -> Result<Self, String> {
        let extra = requirements.extra.as_ref();
        Ok(Self {
            name: extra
                .and_then(|e| e.name.clone())
                .unwrap_or_else(|| USDC_DOMAIN_NAME.to_string()),
            version: extra
                .and_then(|e| e.version.clone())
                .unwrap_or_else(|| USDC_DOMAIN_VERSION.to_string()),
            chain_id: requirements.chain_id()?,
            verifying_contract: requirements.asset_address().parse()
                .map_err(|e| format!("Invalid asset address: {}", e))?,
        })
    }

    fn separator(&self) -> H256 {
        let type_hash = keccak256(
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)"
        );

        let encoded = ethers::abi::encode(&[
            ethers::abi::Token::FixedBytes(type_hash.to_vec()),
            ethers::abi::Token::FixedBytes(keccak256(self.name.as_bytes()).to_vec()),
            ethers::abi::Token::FixedBytes(keccak256(self.version.as_bytes()).to_vec()),
            ethers::abi::Token::Uint(U256::from(self.chain_id)),
            ethers::abi::Token::Address(self.verifying_contract),
        ]);

        H256::from(keccak256(&encoded))
    }
}

/// TransferWithAuthorization message for EIP-3009
struct TransferWithAuthorizationMessage {
    from: Address,
    to: Address,
    value: U256,
    valid_after: U256,
    valid_before: U256,
    nonce: H256,
}

impl TransferWithAuthorizationMessage {
    fn struct_hash(&self) -> H256 {
        let type_hash = keccak256(
            b"TransferWithAuthorization(address from,address to,uint256 value,uint256 validAfter,uint256 validBefore,bytes32 nonce)"
        );

        let encoded = ethers::abi::encode(&[
            ethers::abi::Token::FixedBytes(type_hash.to_vec()),
            ethers::abi::Token::Address(self.from),
            ethers::abi::Token::Address(self.to),
            ethers::abi::Token::Uint(self.value),
            ethers::abi::Token::Uint(self.valid_after),
            ethers::abi::Token::Uint(self.valid_before),
            ethers::abi::Token::FixedBytes(self.nonce.as_bytes().to_vec()),
        ]);

        H256::from(keccak256(&encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Signature;

    // Hardhat account #0 (DO NOT USE IN PRODUCTION)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn requirements() -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".to_string(),
            network: "eip155:8453".to_string(),
            max_amount_required: "1000000".to_string(),
            pay_to_address: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string(),
            asset: USDC_ADDRESS.to_string(),
            max_timeout_seconds: 60,
            resource: None,
            description: None,
            extra: None,
        }
    }

    #[test]
    fn test_address_derivation() {
        let signer = LocalWalletSigner::new(TEST_KEY).unwrap();
        assert_eq!(signer.address(), TEST_ADDRESS);

        let no_prefix = LocalWalletSigner::new(TEST_KEY.trim_start_matches("0x")).unwrap();
        assert_eq!(no_prefix.address(), TEST_ADDRESS);
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(LocalWalletSigner::new("0xnothex").is_err());
        assert!(LocalWalletSigner::new("0xabcd").is_err());
        assert!(LocalWalletSigner::new("").is_err());
    }

    #[tokio::test]
    async fn test_signature_recovers_to_wallet() {
        let signer = LocalWalletSigner::new(TEST_KEY).unwrap();
        let req = requirements();
        let signed = signer.sign_authorization(&req).await.unwrap();

        assert_eq!(signed.authorization.from, TEST_ADDRESS);
        assert_eq!(signed.authorization.to, req.pay_to_address.to_lowercase());
        assert_eq!(signed.authorization.value, "1000000");
        assert_eq!(signed.authorization.valid_after, "0");

        let nonce: H256 = signed.authorization.nonce.parse().unwrap();
        let message = TransferWithAuthorizationMessage {
            from: TEST_ADDRESS.parse().unwrap(),
            to: req.pay_to_address.parse().unwrap(),
            value: U256::from(1_000_000u64),
            valid_after: U256::zero(),
            valid_before: U256::from_dec_str(&signed.authorization.valid_before).unwrap(),
            nonce,
        };
        let domain = Eip712Domain::for_requirements(&req).unwrap();
        let digest = typed_data_digest(&domain, &message);

        let signature: Signature = signed.signature.parse().unwrap();
        let recovered = signature.recover(digest).unwrap();
        assert_eq!(format!("{:?}", recovered).to_lowercase(), TEST_ADDRESS);
    }

    #[tokio::test]
    async fn test_nonces_are_unique() {
        let signer = LocalWalletSigner::new(TEST_KEY).unwrap();
        let a = signer.sign_authorization(&requirements()).await.unwrap();
        let b = signer.sign_authorization(&requirements()).await.unwrap();
        assert_ne!(a.authorization.nonce, b.authorization.nonce);
    }

    #[tokio::test]
    async fn test_unsupported_network_fails() {
        let signer = LocalWalletSigner::new(TEST_KEY).unwrap();
        let mut req = requirements();
        req.network = "solana".to_string();
        assert!(signer.sign_authorization(&req).await.is_err());
    }
}
