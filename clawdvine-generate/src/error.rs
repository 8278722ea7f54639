//! Fatal error kinds of a generation run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{0} is required")]
    MissingArgument(&'static str),

    #[error("{0} env var is required")]
    MissingCredential(&'static str),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-202 answer or no task id; `body` is the raw response, pretty-printed when JSON
    #[error("Generation failed (HTTP {status}): {body}")]
    SubmissionRejected { status: u16, body: String },

    #[error("Payment failed: {0}")]
    Payment(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Failed after {elapsed_secs}s: {message}")]
    JobFailed { elapsed_secs: u64, message: String },

    #[error("Timed out after {0}")]
    Timeout(&'static str),
}

impl GenerateError {
    /// Process exit code; every kind is fatal.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

impl From<reqwest::Error> for GenerateError {
    fn from(e: reqwest::Error) -> Self {
        GenerateError::Http(e.to_string())
    }
}
