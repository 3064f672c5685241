//! Resident generation daemon adapter.
//!
//! Talks to a long-running generation daemon over a Unix socket with one
//! line-delimited JSON message per connection: a request line out, a reply
//! line back. This is the richest backend shape: it keeps the model warm
//! across requests and reports realized seed/bpm/key metadata, so the
//! session probes it first.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::WorkerConfig;
use crate::error::{ErrorCode, Result, WorkerError};
use crate::types::GenerationRequest;

use super::backend::{
    AudioArtifact, ConditionerProvider, PromptConditioner, PromptPlan, SynthesisBackend,
    SynthesisOutcome, SynthesisProvider, SynthesisSpec,
};

/// Generation request line sent to the daemon.
#[derive(Debug, Serialize)]
struct GenerateMessage<'a> {
    command: &'static str,
    caption: &'a str,
    lyrics: &'a str,
    duration_s: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    bpm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_scale: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_signature: Option<&'a str>,
    language: &'a str,
    steps: u32,
    guidance: f64,
    seed: i64,
    thinking: bool,
    use_format: bool,
    batch: u32,
    format: &'static str,
    output: String,
    config: &'a str,
    checkpoint: String,
    device: &'static str,
    attention: &'static str,
}

/// Daemon reply to a generate message.
///
/// A successful reply always carries `path`, which is what disambiguates
/// the untagged variants.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerateReply {
    Ok {
        ok: bool,
        path: PathBuf,
        #[serde(default)]
        seed: Option<i64>,
        #[serde(default)]
        bpm: Option<u32>,
        #[serde(default)]
        key_scale: Option<String>,
    },
    Err {
        #[allow(dead_code)]
        ok: bool,
        error: String,
    },
}

/// Plan request line sent to the daemon.
#[derive(Debug, Serialize)]
struct PlanMessage<'a> {
    command: &'static str,
    caption: &'a str,
    lyrics: &'a str,
    language: &'a str,
    duration_s: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    bpm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_scale: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_signature: Option<&'a str>,
    use_format: bool,
}

/// Daemon reply to a plan message.
#[derive(Debug, Deserialize)]
struct PlanReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    lyrics: Option<String>,
    #[serde(default)]
    bpm: Option<u32>,
    #[serde(default)]
    key_scale: Option<String>,
    #[serde(default)]
    time_signature: Option<String>,
}

/// Sends one request line and reads one reply line.
fn round_trip(socket_path: &Path, message: &str) -> std::io::Result<String> {
    let mut stream = UnixStream::connect(socket_path)?;
    stream.write_all(message.as_bytes())?;
    stream.write_all(b"\n")?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line)
}

/// Synthesis backend backed by the resident daemon.
pub struct DaemonBackend {
    socket_path: PathBuf,
    config_id: String,
    checkpoint: PathBuf,
    device: &'static str,
    attention: &'static str,
}

impl DaemonBackend {
    fn from_config(config: &WorkerConfig) -> Self {
        Self {
            socket_path: config.socket_path.clone(),
            config_id: config.config_id.clone(),
            checkpoint: config.effective_checkpoint_path(),
            device: config.device.as_str(),
            attention: config.attention.as_str(),
        }
    }
}

impl SynthesisBackend for DaemonBackend {
    fn name(&self) -> &'static str {
        "daemon"
    }

    fn synthesize(&self, spec: &SynthesisSpec, scratch: &Path) -> Result<SynthesisOutcome> {
        let output = scratch.join(format!("output.{}", spec.audio_format.extension()));
        let message = GenerateMessage {
            command: "generate",
            caption: &spec.caption,
            lyrics: &spec.lyrics,
            duration_s: spec.duration,
            bpm: spec.bpm,
            key_scale: spec.key_scale.as_deref(),
            time_signature: spec.time_signature.as_deref(),
            language: &spec.vocal_language,
            steps: spec.inference_steps,
            guidance: spec.guidance_scale,
            seed: spec.seed,
            thinking: spec.thinking,
            use_format: spec.use_format,
            batch: spec.batch_size,
            format: spec.audio_format.as_str(),
            output: output.to_string_lossy().into_owned(),
            config: &self.config_id,
            checkpoint: self.checkpoint.to_string_lossy().into_owned(),
            device: self.device,
            attention: self.attention,
        };

        let json = serde_json::to_string(&message)
            .map_err(|e| WorkerError::with_source(ErrorCode::Internal, "encode daemon request", e))?;
        let line = round_trip(&self.socket_path, &json).map_err(|e| {
            WorkerError::with_source(
                ErrorCode::GenerationFailed,
                format!("daemon request failed: {}", e),
                e,
            )
        })?;

        let line = line.trim();
        if line.is_empty() {
            return Ok(SynthesisOutcome::failure(
                "daemon closed the connection without a reply",
            ));
        }

        match serde_json::from_str::<GenerateReply>(line) {
            Ok(GenerateReply::Ok {
                ok: true,
                path,
                seed,
                bpm,
                key_scale,
            }) => {
                let artifact = AudioArtifact {
                    path: Some(path),
                    tensor: None,
                    seed,
                    bpm,
                    key_scale: key_scale.clone(),
                };
                let mut outcome = SynthesisOutcome::ok(vec![artifact]);
                outcome.seed = seed;
                outcome.bpm = bpm;
                outcome.key_scale = key_scale;
                Ok(outcome)
            }
            Ok(GenerateReply::Ok { ok: false, .. }) => Ok(SynthesisOutcome::failure(
                "daemon replied ok=false without detail",
            )),
            Ok(GenerateReply::Err { error, .. }) => Ok(SynthesisOutcome::failure(error)),
            Err(e) => Ok(SynthesisOutcome::failure(format!(
                "unparseable daemon reply: {}",
                e
            ))),
        }
    }
}

/// Prompt conditioner backed by the resident daemon's plan command.
pub struct DaemonConditioner {
    socket_path: PathBuf,
}

impl PromptConditioner for DaemonConditioner {
    fn name(&self) -> &'static str {
        "daemon"
    }

    fn condition(&self, request: &GenerationRequest) -> Result<PromptPlan> {
        let message = PlanMessage {
            command: "plan",
            caption: &request.caption,
            lyrics: &request.lyrics,
            language: &request.vocal_language,
            duration_s: request.duration,
            bpm: request.bpm,
            key_scale: request.key_scale.as_deref(),
            time_signature: request.time_signature.as_deref(),
            use_format: request.use_format,
        };

        let json = serde_json::to_string(&message)
            .map_err(|e| WorkerError::with_source(ErrorCode::Internal, "encode plan request", e))?;
        let line = round_trip(&self.socket_path, &json).map_err(|e| {
            WorkerError::with_source(
                ErrorCode::Internal,
                format!("plan request failed: {}", e),
                e,
            )
        })?;

        let reply: PlanReply = serde_json::from_str(line.trim()).map_err(|e| {
            WorkerError::with_source(ErrorCode::Internal, "unparseable plan reply", e)
        })?;

        if !reply.ok {
            return Err(WorkerError::new(
                ErrorCode::Internal,
                reply
                    .error
                    .unwrap_or_else(|| "daemon rejected plan request".to_string()),
            ));
        }

        Ok(PromptPlan {
            caption: reply.caption,
            lyrics: reply.lyrics,
            bpm: reply.bpm,
            key_scale: reply.key_scale,
            time_signature: reply.time_signature,
        })
    }
}

/// Probes the daemon socket and constructs [`DaemonBackend`].
pub struct DaemonProvider;

impl SynthesisProvider for DaemonProvider {
    fn name(&self) -> &'static str {
        "daemon"
    }

    fn initialize(&self, config: &WorkerConfig) -> Result<Arc<dyn SynthesisBackend>> {
        match UnixStream::connect(&config.socket_path) {
            Ok(_) => Ok(Arc::new(DaemonBackend::from_config(config))),
            Err(e) => Err(WorkerError::with_source(
                ErrorCode::ModelInitFailed,
                format!("daemon not reachable at {}", config.socket_path.display()),
                e,
            )),
        }
    }
}

/// Probes the daemon socket and constructs [`DaemonConditioner`].
pub struct DaemonConditionerProvider;

impl ConditionerProvider for DaemonConditionerProvider {
    fn name(&self) -> &'static str {
        "daemon"
    }

    fn initialize(&self, config: &WorkerConfig) -> Result<Arc<dyn PromptConditioner>> {
        match UnixStream::connect(&config.socket_path) {
            Ok(_) => Ok(Arc::new(DaemonConditioner {
                socket_path: config.socket_path.clone(),
            })),
            Err(e) => Err(WorkerError::with_source(
                ErrorCode::ModelInitFailed,
                format!("daemon not reachable at {}", config.socket_path.display()),
                e,
            )),
        }
    }
}
