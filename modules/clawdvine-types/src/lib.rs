//! Shared wire types for the ClawdVine generation API.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// =====================================================
// Requests
// =====================================================

/// Body of `POST /generation/create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub video_model: String,
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

// =====================================================
// Responses
// =====================================================

/// Body of a `202 Accepted` answer to `POST /generation/create`.
///
/// Rejections come back with arbitrary JSON, so every field is optional and
/// the caller decides whether the answer is usable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub explorer: Option<String>,
}

/// Lifecycle state reported by the server.
///
/// Values the client does not know are kept verbatim, and a missing or null
/// status reads as `Unknown`; neither is ever terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<String>")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Other(String),
    #[default]
    Unknown,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Other(s) => s,
            TaskStatus::Unknown => "unknown",
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => TaskStatus::Queued,
            "processing" => TaskStatus::Processing,
            "completed" => TaskStatus::Completed,
            "failed" => TaskStatus::Failed,
            _ => TaskStatus::Other(s),
        }
    }
}

impl From<Option<String>> for TaskStatus {
    fn from(s: Option<String>) -> Self {
        s.map(TaskStatus::from).unwrap_or_default()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentages arrive as numbers, numeric strings (`"45"`, `"45%"`) or null;
/// anything else reads as absent.
fn lenient_percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskMetadata {
    #[serde(default, deserialize_with = "lenient_percent")]
    pub percent: Option<f64>,
}

/// Media links of a finished generation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratedMedia {
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub gif: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub generation: Option<GeneratedMedia>,
}

/// Snapshot returned by `GET /generation/{taskId}/status`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "lenient_percent")]
    pub progress: Option<f64>,
    #[serde(default)]
    pub metadata: Option<TaskMetadata>,
    #[serde(default)]
    pub result: Option<TaskResult>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub explorer: Option<String>,
}

impl TaskSnapshot {
    /// A bare snapshot carrying only a status
    pub fn with_status(status: TaskStatus) -> Self {
        Self {
            status,
            progress: None,
            metadata: None,
            result: None,
            error: None,
            tx_hash: None,
            explorer: None,
        }
    }

    /// Progress percentage for display: `metadata.percent` if present, else
    /// the top-level `progress`, else 0.
    pub fn percent(&self) -> f64 {
        self.metadata
            .as_ref()
            .and_then(|m| m.percent)
            .or(self.progress)
            .unwrap_or(0.0)
    }

    pub fn media(&self) -> Option<&GeneratedMedia> {
        self.result.as_ref().and_then(|r| r.generation.as_ref())
    }
}
