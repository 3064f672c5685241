//! Per-job request handler.
//!
//! This is the single error boundary of the worker: everything that can go
//! wrong inside a job surfaces here and becomes an `{"error": ...}` payload
//! instead of tearing the process down. Audio lands in a scratch directory
//! that is removed before the handler returns, on success and failure alike.

use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tracing::{error, info};

use crate::config::WorkerConfig;
use crate::error::{ErrorCode, Result, WorkerError};
use crate::generation::{generate, resolve_artifact};
use crate::models::ModelSession;
use crate::types::GenerationRequest;

use super::types::{job_params, ResponsePayload, SuccessPayload};

/// Handles one job and always produces a response payload.
pub fn handle(job: &Value, session: &ModelSession, config: &WorkerConfig) -> ResponsePayload {
    match run(job, session, config) {
        Ok(payload) => ResponsePayload::Success(payload),
        Err(e) => {
            error!("job failed: {}", e);
            ResponsePayload::Failure {
                error: e.to_string(),
            }
        }
    }
}

fn run(job: &Value, session: &ModelSession, config: &WorkerConfig) -> Result<SuccessPayload> {
    let request = GenerationRequest::from_value(job_params(job));
    info!(
        duration = request.duration,
        format = request.audio_format.as_str(),
        thinking = request.thinking,
        "handling generation request"
    );

    let handles = session.acquire(config)?;
    let started = Instant::now();

    // Dropped at the end of run(), which removes the directory on every
    // path out of this function, including the ? returns below.
    let scratch = tempfile::Builder::new()
        .prefix("acestep_")
        .tempdir()
        .map_err(|e| {
            WorkerError::with_source(ErrorCode::Internal, "failed to create scratch directory", e)
        })?;

    let outcome = generate(&request, &handles, scratch.path())?;
    let artifact = outcome
        .artifacts
        .first()
        .ok_or_else(|| WorkerError::generation_failed("backend produced no audio artifacts"))?;
    let bytes = resolve_artifact(artifact, request.audio_format, scratch.path())?;

    let generation_time = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;
    info!(
        bytes = bytes.len(),
        generation_time, "generation finished"
    );

    Ok(SuccessPayload {
        audio_base64: STANDARD.encode(&bytes),
        duration: request.duration,
        seed: outcome.seed.unwrap_or_default(),
        bpm: outcome.bpm,
        key_scale: outcome.key_scale.clone(),
        model: config.model_id.clone(),
        format: request.audio_format.as_str().to_string(),
        generation_time: Some(generation_time),
    })
}
