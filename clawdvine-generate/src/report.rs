//! Operator-facing output.
//!
//! Everything the operator reads goes through [`Reporter`]; diagnostics go to
//! the log instead. Write failures on the terminal are ignored.

use clawdvine_types::{GenerationRequest, TaskSnapshot};
use std::io::{self, Stderr, Stdout, Write};

use crate::error::GenerateError;
use crate::poll::PollPolicy;
use crate::submit::{PaymentReceipt, Submission};

const SHARE_BASE_URL: &str = "https://clawdvine.sh/media";
const PROMPT_PREVIEW_CHARS: usize = 80;

pub const USAGE: &str = "Usage: EVM_PRIVATE_KEY=0x... clawdvine-generate \"prompt\" [model] [duration] [agentId]";
pub const MODELS_HINT: &str = "Models: xai-grok-imagine (default), sora-2, sora-2-pro";

/// Public page for a task
pub fn share_url(task_id: &str) -> String {
    format!("{}/{}", SHARE_BASE_URL, task_id)
}

pub struct Reporter<O: Write, E: Write> {
    out: O,
    err: E,
    /// A `\r` progress line is on screen without a trailing newline
    progress_open: bool,
}

impl Reporter<Stdout, Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Reporter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            progress_open: false,
        }
    }

    pub fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }

    pub fn banner(&mut self, request: &GenerationRequest) {
        self.say("\n🎬 Generating video...");
        self.say(&format!("   Prompt:   \"{}\"", preview(&request.prompt)));
        self.say(&format!("   Model:    {}", request.video_model));
        self.say(&format!("   Duration: {}s", request.duration));
        if let Some(agent) = &request.agent_id {
            self.say(&format!("   Agent:    {}", agent));
        }
        self.say("");
    }

    pub fn queued(&mut self, submission: &Submission) {
        self.say(&format!("✅ Queued: {}", submission.task_id));
        if let Some(payment) = &submission.payment {
            self.say(&format!("💳 Payment: {}", payment.link()));
        }
        self.say("⏳ Polling...\n");
    }

    pub fn slow_model(&mut self, policy: &PollPolicy) {
        self.say(&format!(
            "ℹ️  Slow model detected: polling every {}s, timeout {}\n",
            policy.interval.as_secs(),
            policy.timeout_label
        ));
    }

    /// Overwrites the current progress line in place
    pub fn progress(&mut self, snapshot: &TaskSnapshot, elapsed_secs: u64) {
        let _ = write!(
            self.out,
            "\r   {} {}% ({}s)",
            snapshot.status,
            format_percent(snapshot.percent()),
            elapsed_secs
        );
        let _ = self.out.flush();
        self.progress_open = true;
    }

    pub fn completed(&mut self, task_id: &str, snapshot: &TaskSnapshot, elapsed_secs: u64) {
        self.close_progress_out();
        let media = snapshot.media();
        self.say(&format!("\n🎉 Complete! ({}s)", elapsed_secs));
        self.say(&format!(
            "🎬 Video: {}",
            media.and_then(|m| m.video.as_deref()).unwrap_or("(not provided)")
        ));
        if let Some(thumb) = media.and_then(|m| m.image.as_deref()) {
            self.say(&format!("🖼️  Thumb: {}", thumb));
        }
        if let Some(gif) = media.and_then(|m| m.gif.as_deref()) {
            self.say(&format!("🎞️  GIF:   {}", gif));
        }
        self.say(&format!("🔗 Share: {}", share_url(task_id)));
        if let Some(payment) =
            PaymentReceipt::from_parts(snapshot.tx_hash.clone(), snapshot.explorer.clone())
        {
            self.say(&format!("💳 TX:    {}", payment.link()));
        }
    }

    pub fn usage(&mut self) {
        self.shout(USAGE);
        self.shout(MODELS_HINT);
    }

    pub fn error(&mut self, error: &GenerateError) {
        self.close_progress_out();
        match error {
            GenerateError::MissingArgument(_) => {
                self.shout(&format!("Error: {}", error));
                self.usage();
            }
            GenerateError::JobFailed { .. } | GenerateError::Timeout(_) => {
                self.shout(&format!("\n❌ {}", error));
            }
            _ => self.shout(&format!("❌ {}", error)),
        }
    }

    fn close_progress_out(&mut self) {
        if self.progress_open {
            let _ = writeln!(self.out);
            self.progress_open = false;
        }
    }

    fn say(&mut self, line: &str) {
        let _ = writeln!(self.out, "{}", line);
    }

    fn shout(&mut self, line: &str) {
        let _ = writeln!(self.err, "{}", line);
    }
}

fn preview(prompt: &str) -> String {
    match prompt.char_indices().nth(PROMPT_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &prompt[..idx]),
        None => prompt.to_string(),
    }
}

fn format_percent(pct: f64) -> String {
    if pct.is_finite() && pct.fract() == 0.0 {
        format!("{:.0}", pct)
    } else {
        format!("{:.1}", pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawdvine_types::TaskStatus;

    fn reporter() -> Reporter<Vec<u8>, Vec<u8>> {
        Reporter::new(Vec::new(), Vec::new())
    }

    fn output(reporter: Reporter<Vec<u8>, Vec<u8>>) -> (String, String) {
        let (out, err) = reporter.into_parts();
        (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    #[test]
    fn test_share_url() {
        assert_eq!(share_url("task_123"), "https://clawdvine.sh/media/task_123");
    }

    #[test]
    fn test_banner_truncates_long_prompt() {
        let mut r = reporter();
        r.banner(&GenerationRequest {
            prompt: "x".repeat(100),
            video_model: "sora-2".to_string(),
            duration: 8,
            agent_id: Some("agent-9".to_string()),
        });
        let (out, _) = output(r);
        assert!(out.contains(&format!("\"{}...\"", "x".repeat(80))));
        assert!(out.contains("Model:    sora-2"));
        assert!(out.contains("Agent:    agent-9"));
    }

    #[test]
    fn test_queued_payment_link_falls_back_to_basescan() {
        let mut r = reporter();
        r.queued(&Submission {
            task_id: "t1".to_string(),
            payment: PaymentReceipt::from_parts(Some("0xfeed".to_string()), None),
        });
        let (out, _) = output(r);
        assert!(out.contains("✅ Queued: t1"));
        assert!(out.contains("💳 Payment: https://basescan.org/tx/0xfeed"));
    }

    #[test]
    fn test_progress_line_overwrites_in_place() {
        let mut r = reporter();
        let mut snap = TaskSnapshot::with_status(TaskStatus::Processing);
        snap.progress = Some(37.0);
        r.progress(&snap, 15);
        let (out, _) = output(r);
        assert_eq!(out, "\r   processing 37% (15s)");
    }

    #[test]
    fn test_completed_lists_media() {
        let snap: TaskSnapshot = serde_json::from_str(
            r#"{"status":"completed","result":{"generation":{"video":"https://v","gif":"https://g"}},
                "txHash":"0x1","explorer":"https://explorer/tx/0x1"}"#,
        )
        .unwrap();
        let mut r = reporter();
        r.completed("abc", &snap, 42);
        let (out, err) = output(r);
        assert!(out.contains("🎉 Complete! (42s)"));
        assert!(out.contains("🎬 Video: https://v"));
        assert!(!out.contains("Thumb"));
        assert!(out.contains("🎞️  GIF:   https://g"));
        assert!(out.contains("🔗 Share: https://clawdvine.sh/media/abc"));
        assert!(out.contains("💳 TX:    https://explorer/tx/0x1"));
        assert!(err.is_empty());
    }

    #[test]
    fn test_missing_prompt_prints_usage() {
        let mut r = reporter();
        r.error(&GenerateError::MissingArgument("prompt"));
        let (out, err) = output(r);
        assert!(out.is_empty());
        assert!(err.contains("prompt is required"));
        assert!(err.contains(USAGE));
    }

    #[test]
    fn test_error_after_progress_breaks_line() {
        let mut r = reporter();
        r.progress(&TaskSnapshot::with_status(TaskStatus::Queued), 5);
        r.error(&GenerateError::JobFailed { elapsed_secs: 10, message: "nsfw".to_string() });
        let (out, err) = output(r);
        assert!(out.ends_with('\n'));
        assert!(err.contains("❌ Failed after 10s: nsfw"));
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.0), "0");
        assert_eq!(format_percent(55.5), "55.5");
    }
}
