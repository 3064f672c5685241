//! acestep-worker: serverless music generation worker driving ACE-Step backends.
//!
//! This binary can run in two modes:
//! - Worker mode: one JSON job per stdin line, one JSON response per line
//! - One-shot mode: generate a single clip from command-line arguments

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing_subscriber::EnvFilter;

use acestep_worker::cli::Cli;
use acestep_worker::config::WorkerConfig;
use acestep_worker::error::{ErrorCode, Result, WorkerError};
use acestep_worker::models::{
    default_conditioner_providers, default_synthesis_providers, ModelSession,
};
use acestep_worker::worker::{handle, run_worker, ResponsePayload};

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Structured logs go to stderr so stdout stays a pure response stream.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config = WorkerConfig::from_env();
    if let Some(problem) = config.validate() {
        tracing::warn!("configuration problem: {}", problem);
    }

    let session = ModelSession::new(
        default_synthesis_providers(&config),
        default_conditioner_providers(&config),
    );

    if cli.is_worker_mode() {
        run_worker(&session, &config)
    } else if cli.is_oneshot_mode() {
        run_oneshot(&cli, &session, &config)
    } else {
        print_usage();
        Ok(())
    }
}

/// Generates a single clip from the command-line arguments.
fn run_oneshot(cli: &Cli, session: &ModelSession, config: &WorkerConfig) -> Result<()> {
    let job = cli.to_job_value();

    match handle(&job, session, config) {
        ResponsePayload::Success(payload) => {
            let bytes = STANDARD.decode(&payload.audio_base64).map_err(|e| {
                WorkerError::with_source(ErrorCode::Internal, "failed to decode audio payload", e)
            })?;
            let output = cli.output_path();
            std::fs::write(&output, &bytes).map_err(|e| {
                WorkerError::with_source(
                    ErrorCode::Internal,
                    format!("failed to write {}", output.display()),
                    e,
                )
            })?;

            eprintln!("Generation complete!");
            eprintln!("  Seed: {}", payload.seed);
            if let Some(bpm) = payload.bpm {
                eprintln!("  BPM: {}", bpm);
            }
            if let Some(key_scale) = &payload.key_scale {
                eprintln!("  Key: {}", key_scale);
            }
            if let Some(time) = payload.generation_time {
                eprintln!("  Time: {:.2}s", time);
            }
            eprintln!("Saved to: {}", output.display());
            Ok(())
        }
        ResponsePayload::Failure { error } => {
            // The handler already logged the details
            eprintln!("Error: {}", error);
            std::process::exit(1);
        }
    }
}

/// Prints usage information.
fn print_usage() {
    eprintln!("acestep-worker: serverless music generation worker for ACE-Step");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  One-shot generation:");
    eprintln!("    acestep-worker --caption \"lofi hip hop beats\" --duration 60 --output song.mp3");
    eprintln!();
    eprintln!("  Worker mode (one JSON job per stdin line):");
    eprintln!("    acestep-worker --worker");
    eprintln!();
    eprintln!("  Jobs look like:");
    eprintln!("    {{\"input\": {{\"caption\": \"lofi beats\", \"duration\": 60, \"seed\": -1}}}}");
    eprintln!();
    eprintln!("Run 'acestep-worker --help' for full options.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_usage_doesnt_panic() {
        print_usage();
    }
}
