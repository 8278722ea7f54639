//! Submission step: build the generation request and send it, paid, once.

use clawdvine_types::{CreateResponse, GenerationRequest};

use crate::api::{CreateOutcome, GenerationApi};
use crate::config::{Config, DEFAULT_DURATION_SECS};
use crate::error::GenerateError;

const DEFAULT_EXPLORER_TX_URL: &str = "https://basescan.org/tx";

/// On-chain settlement of a paid request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub tx_hash: String,
    pub explorer: Option<String>,
}

impl PaymentReceipt {
    /// `None` unless a transaction hash was reported
    pub fn from_parts(tx_hash: Option<String>, explorer: Option<String>) -> Option<Self> {
        tx_hash
            .filter(|h| !h.is_empty())
            .map(|tx_hash| Self { tx_hash, explorer: explorer.filter(|e| !e.is_empty()) })
    }

    pub fn link(&self) -> String {
        match &self.explorer {
            Some(url) => url.clone(),
            None => format!("{}/{}", DEFAULT_EXPLORER_TX_URL, self.tx_hash),
        }
    }
}

/// An accepted generation task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub task_id: String,
    pub payment: Option<PaymentReceipt>,
}

/// Assemble the request from CLI values, falling back to configured defaults.
///
/// Runs before any credential is loaded or any request is made.
pub fn build_request(
    prompt: Option<String>,
    model: Option<String>,
    duration: Option<u32>,
    agent_id: Option<String>,
    config: &Config,
) -> Result<GenerationRequest, GenerateError> {
    let prompt = prompt
        .filter(|p| !p.is_empty())
        .ok_or(GenerateError::MissingArgument("prompt"))?;

    Ok(GenerationRequest {
        prompt,
        video_model: model
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| config.default_model.clone()),
        duration: duration.unwrap_or(DEFAULT_DURATION_SECS),
        agent_id: agent_id
            .filter(|a| !a.is_empty())
            .or_else(|| config.default_agent_id.clone()),
    })
}

pub async fn submit(
    api: &dyn GenerationApi,
    request: &GenerationRequest,
) -> Result<Submission, GenerateError> {
    log::info!(
        "[SUBMIT] Creating generation (model={}, duration={}s)",
        request.video_model,
        request.duration
    );

    let outcome = api.create(request).await?;
    let submission = interpret_create(outcome)?;

    log::info!("[SUBMIT] Accepted as task {}", submission.task_id);
    Ok(submission)
}

/// Only `202 Accepted` carrying a task id counts as success.
fn interpret_create(outcome: CreateOutcome) -> Result<Submission, GenerateError> {
    let parsed: Option<serde_json::Value> = serde_json::from_str(&outcome.body).ok();

    let rejected = || GenerateError::SubmissionRejected {
        status: outcome.status,
        body: parsed
            .as_ref()
            .and_then(|v| serde_json::to_string_pretty(v).ok())
            .unwrap_or_else(|| outcome.body.clone()),
    };

    if outcome.status != 202 {
        return Err(rejected());
    }

    let response: CreateResponse = parsed
        .clone()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    let task_id = match response.task_id.filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => return Err(rejected()),
    };

    Ok(Submission {
        task_id,
        payment: PaymentReceipt::from_parts(response.tx_hash, response.explorer),
    })
}
