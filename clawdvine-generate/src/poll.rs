//! Polling loop for a submitted task.
//!
//! The loop is a small state machine: `Pending` until the server reports a
//! terminal status or the attempt ceiling is reached. [`transition`] is pure;
//! [`Poller`] drives it with one status query per fixed interval.

use clawdvine_types::{TaskSnapshot, TaskStatus};
use std::io::Write;
use std::time::Duration;
use tokio::time::Instant;

use crate::api::GenerationApi;
use crate::error::GenerateError;
use crate::report::Reporter;

/// Models known to take 7-15+ minutes
pub const SLOW_MODELS: &[&str] = &["fal-kling-o3"];

const MAX_ATTEMPTS: u32 = 120;

pub fn is_slow_model(model: &str) -> bool {
    SLOW_MODELS.iter().any(|m| model.starts_with(m)) || model.contains("kling")
}

/// Interval and ceiling, fixed for the lifetime of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub timeout_label: &'static str,
    pub slow: bool,
}

impl PollPolicy {
    pub fn for_model(model: &str) -> Self {
        if is_slow_model(model) {
            Self {
                interval: Duration::from_secs(10),
                max_attempts: MAX_ATTEMPTS,
                timeout_label: "20 minutes",
                slow: true,
            }
        } else {
            Self {
                interval: Duration::from_secs(5),
                max_attempts: MAX_ATTEMPTS,
                timeout_label: "10 minutes",
                slow: false,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Pending,
    Completed,
    Failed,
    TimedOut,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        self != PollState::Pending
    }
}

/// Next state after the zero-based `attempt` returned `snapshot`.
///
/// Terminal states are absorbing. Only the server's reported status moves the
/// machine to `Completed` or `Failed`.
pub fn transition(
    state: PollState,
    snapshot: &TaskSnapshot,
    attempt: u32,
    policy: &PollPolicy,
) -> PollState {
    if state.is_terminal() {
        return state;
    }
    if snapshot.status.is_terminal() {
        return match snapshot.status {
            TaskStatus::Completed => PollState::Completed,
            _ => PollState::Failed,
        };
    }
    if attempt + 1 >= policy.max_attempts {
        PollState::TimedOut
    } else {
        PollState::Pending
    }
}

/// A finished task
#[derive(Debug, Clone)]
pub struct Completion {
    pub snapshot: TaskSnapshot,
    pub elapsed_secs: u64,
}

pub struct Poller<'a> {
    api: &'a dyn GenerationApi,
    task_id: String,
    policy: PollPolicy,
    state: PollState,
    started: Instant,
}

impl<'a> Poller<'a> {
    pub fn new(api: &'a dyn GenerationApi, task_id: &str, policy: PollPolicy) -> Self {
        Self {
            api,
            task_id: task_id.to_string(),
            policy,
            state: PollState::Pending,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    fn elapsed_secs(&self) -> u64 {
        self.started.elapsed().as_secs_f64().round() as u64
    }

    /// Poll until a terminal state; failure and timeout come back as errors.
    pub async fn run<O: Write, E: Write>(
        mut self,
        reporter: &mut Reporter<O, E>,
    ) -> Result<Completion, GenerateError> {
        log::info!(
            "[POLL] Task {}: every {:?}, at most {} attempts",
            self.task_id,
            self.policy.interval,
            self.policy.max_attempts
        );

        for attempt in 0..self.policy.max_attempts {
            tokio::time::sleep(self.policy.interval).await;

            let snapshot = self.api.status(&self.task_id).await?;
            let elapsed_secs = self.elapsed_secs();
            self.state = transition(self.state, &snapshot, attempt, &self.policy);

            log::debug!(
                "[POLL] Attempt {}: server status {} -> {:?}",
                attempt + 1,
                snapshot.status,
                self.state
            );

            match self.state {
                PollState::Completed => {
                    return Ok(Completion { snapshot, elapsed_secs });
                }
                PollState::Failed => {
                    return Err(GenerateError::JobFailed {
                        elapsed_secs,
                        message: snapshot
                            .error
                            .unwrap_or_else(|| "unknown error".to_string()),
                    });
                }
                PollState::TimedOut => {
                    reporter.progress(&snapshot, elapsed_secs);
                    break;
                }
                PollState::Pending => reporter.progress(&snapshot, elapsed_secs),
            }
        }

        log::warn!("[POLL] Task {} timed out", self.task_id);
        Err(GenerateError::Timeout(self.policy.timeout_label))
    }
}
