//! clawdvine-generate: submit a paid video generation and wait for the result.
//!
//! Usage: `EVM_PRIVATE_KEY=0x... clawdvine-generate "prompt" [model] [duration] [agentId]`

mod api;
mod config;
mod error;
mod http;
mod poll;
mod report;
mod submit;
mod x402;

#[cfg(test)]
mod testing;

use clap::Parser;
use clawdvine_types::GenerationRequest;
use std::io::Write;
use std::process::ExitCode;

use api::{ClawdvineApi, GenerationApi};
use config::Config;
use error::GenerateError;
use poll::{PollPolicy, Poller};
use report::Reporter;

#[derive(Debug, Parser)]
#[command(name = "clawdvine-generate", version, about = "Generate a video with automatic x402 payment and polling")]
struct Cli {
    /// Text prompt describing the video
    prompt: Option<String>,
    /// Video model (default: xai-grok-imagine)
    model: Option<String>,
    /// Duration in seconds (default: 8)
    duration: Option<u32>,
    /// Agent id credited with the generation (default: $CLAWDVINE_AGENT_ID)
    agent_id: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::from(1) } else { ExitCode::SUCCESS };
        }
    };

    let mut reporter = Reporter::stdio();
    let result = match Config::from_env() {
        Ok(config) => run(cli, config, connect, &mut reporter).await,
        Err(e) => Err(e),
    };
    ExitCode::from(finish(result, &mut reporter))
}

/// Production API: payment client from the configured key and protocol
fn connect(config: &Config) -> Result<ClawdvineApi, GenerateError> {
    let key = config.private_key()?;
    let payments = x402::create_payment_client(key, config.protocol)
        .map_err(GenerateError::InvalidCredential)?;
    let api = ClawdvineApi::new(&config.api_base, http::shared_client().clone(), payments);
    log::info!("Paying from wallet {}", api.wallet_address());
    Ok(api)
}

/// Validate input, then connect and generate. Nothing touches the network
/// before the request is known to be valid.
async fn run<A, F, O, E>(
    cli: Cli,
    config: Config,
    connect: F,
    reporter: &mut Reporter<O, E>,
) -> Result<(), GenerateError>
where
    A: GenerationApi,
    F: FnOnce(&Config) -> Result<A, GenerateError>,
    O: Write,
    E: Write,
{
    let request = submit::build_request(cli.prompt, cli.model, cli.duration, cli.agent_id, &config)?;
    let api = connect(&config)?;
    generate(&api, &request, reporter).await
}

/// Submission step, then the polling loop, then the final report.
async fn generate<O: Write, E: Write>(
    api: &dyn GenerationApi,
    request: &GenerationRequest,
    reporter: &mut Reporter<O, E>,
) -> Result<(), GenerateError> {
    reporter.banner(request);

    let submission = submit::submit(api, request).await?;
    reporter.queued(&submission);

    let policy = PollPolicy::for_model(&request.video_model);
    if policy.slow {
        reporter.slow_model(&policy);
    }

    let poller = Poller::new(api, &submission.task_id, policy);
    let done = poller.run(reporter).await?;
    reporter.completed(&submission.task_id, &done.snapshot, done.elapsed_secs);
    Ok(())
}

/// Report a fatal error, if any, and pick the exit code.
fn finish<O: Write, E: Write>(result: Result<(), GenerateError>, reporter: &mut Reporter<O, E>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            log::debug!("Exiting on error: {:?}", e);
            reporter.error(&e);
            e.exit_code()
        }
    }
}
