use crate::error::GenerateError;
use crate::x402::PaymentProtocol;

pub const DEFAULT_API_BASE: &str = "https://api.clawdvine.sh";
pub const DEFAULT_MODEL: &str = "xai-grok-imagine";
pub const DEFAULT_DURATION_SECS: u32 = 8;

pub mod env_vars {
    pub const EVM_PRIVATE_KEY: &str = "EVM_PRIVATE_KEY";
    pub const AGENT_ID: &str = "CLAWDVINE_AGENT_ID";
    pub const API_BASE: &str = "CLAWDVINE_API_BASE";
    pub const DEFAULT_MODEL: &str = "CLAWDVINE_DEFAULT_MODEL";
    pub const X402_PROTOCOL: &str = "X402_PROTOCOL";
}

#[derive(Clone)]
pub struct Config {
    pub api_base: String,
    pub default_model: String,
    pub default_agent_id: Option<String>,
    pub protocol: PaymentProtocol,
    private_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, GenerateError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GenerateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let protocol = match get(env_vars::X402_PROTOCOL) {
            Some(name) => PaymentProtocol::from_name(&name).map_err(GenerateError::Config)?,
            None => PaymentProtocol::V2,
        };

        Ok(Self {
            api_base: get(env_vars::API_BASE)
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            default_model: get(env_vars::DEFAULT_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            default_agent_id: get(env_vars::AGENT_ID),
            protocol,
            private_key: get(env_vars::EVM_PRIVATE_KEY),
        })
    }

    /// Signing key; absence is fatal once a request is about to be paid for.
    pub fn private_key(&self) -> Result<&str, GenerateError> {
        self.private_key
            .as_deref()
            .ok_or(GenerateError::MissingCredential(env_vars::EVM_PRIVATE_KEY))
    }
}
