//! Job envelope and response payloads.
//!
//! Serverless platforms deliver jobs as `{"id": ..., "input": {...}}`;
//! direct invocations hand over the bare parameter object. Responses are
//! one JSON object per job: either the audio payload or a single `error`
//! field, never both.

use serde::Serialize;
use serde_json::Value;

/// Extracts the generation parameters from a job envelope.
///
/// Returns the `input` field when present, otherwise the job itself.
pub fn job_params(job: &Value) -> &Value {
    job.get("input").unwrap_or(job)
}

/// Successful generation response.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessPayload {
    /// Base64-encoded audio bytes.
    pub audio_base64: String,
    /// Requested duration in seconds, after clamping.
    pub duration: u32,
    /// Seed the audio was generated with.
    pub seed: i64,
    /// Tempo the backend settled on, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u32>,
    /// Key and scale the backend settled on, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_scale: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Audio format of the payload.
    pub format: String,
    /// Wall-clock generation time in seconds, two decimals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_time: Option<f64>,
}

/// Response written for each job.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Success(SuccessPayload),
    Failure { error: String },
}

impl ResponsePayload {
    /// Builds a failure response from any printable error.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            error: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
