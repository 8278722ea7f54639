//! ClawdVine generation REST API.

use async_trait::async_trait;
use clawdvine_types::{GenerationRequest, TaskSnapshot};
use reqwest::Client;

use crate::error::GenerateError;
use crate::x402::X402Client;

/// Raw answer to a create call; interpretation belongs to the submission step
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// `POST /generation/create`, paid
    async fn create(&self, request: &GenerationRequest) -> Result<CreateOutcome, GenerateError>;

    /// `GET /generation/{taskId}/status`, unpaid
    async fn status(&self, task_id: &str) -> Result<TaskSnapshot, GenerateError>;
}

pub struct ClawdvineApi {
    base_url: String,
    client: Client,
    payments: X402Client,
}

impl ClawdvineApi {
    pub fn new(base_url: &str, client: Client, payments: X402Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            payments,
        }
    }

    pub fn wallet_address(&self) -> String {
        self.payments.wallet_address()
    }
}

#[async_trait]
impl GenerationApi for ClawdvineApi {
    async fn create(&self, request: &GenerationRequest) -> Result<CreateOutcome, GenerateError> {
        let url = format!("{}/generation/create", self.base_url);

        let response = self
            .payments
            .post_with_payment(&url, request)
            .await
            .map_err(GenerateError::Payment)?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(CreateOutcome { status, body })
    }

    async fn status(&self, task_id: &str) -> Result<TaskSnapshot, GenerateError> {
        let url = format!("{}/generation/{}/status", self.base_url, task_id);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            GenerateError::Http(format!(
                "Unreadable status response ({}): {} - {}",
                status,
                e,
                truncate(&body, 200)
            ))
        })
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
