//! Synthesis backend capability contracts.
//!
//! The worker never hardcodes which generation mechanism is present.
//! It depends on two small capability traits, one required
//! ([`SynthesisBackend`]) and one optional ([`PromptConditioner`]), plus
//! a provider seam ([`SynthesisProvider`], [`ConditionerProvider`]) that
//! the session probes in priority order at first use.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::WorkerConfig;
use crate::error::Result;
use crate::types::{AudioFormat, GenerationRequest};

/// Tracks produced per request. The worker is servable one-track-per-request.
pub const BATCH_SIZE: u32 = 1;

/// Fully resolved parameter set handed to a synthesis backend.
///
/// Built from a [`GenerationRequest`] by the orchestrator, which realizes
/// the seed and settles the thinking flag before the call.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisSpec {
    /// Style description, possibly expanded by the conditioning stage.
    pub caption: String,
    /// Lyrics, possibly expanded by the conditioning stage.
    pub lyrics: String,
    /// Track length in seconds.
    pub duration: u32,
    /// Tempo hint.
    pub bpm: Option<u32>,
    /// Key/scale hint.
    pub key_scale: Option<String>,
    /// Time signature hint.
    pub time_signature: Option<String>,
    /// Lyric language code.
    pub vocal_language: String,
    /// Diffusion step count.
    pub inference_steps: u32,
    /// Classifier-free guidance scale.
    pub guidance_scale: f64,
    /// Concrete seed. Non-negative by the time a backend sees it.
    pub seed: i64,
    /// Whether the backend should run its own conditioning stage.
    /// False whenever no conditioner is available for this session.
    pub thinking: bool,
    /// Strict-format toggle for the conditioning stage.
    pub use_format: bool,
    /// Tracks per invocation, fixed at [`BATCH_SIZE`].
    pub batch_size: u32,
    /// Requested output container.
    pub audio_format: AudioFormat,
}

impl SynthesisSpec {
    /// Builds a spec from a normalized request.
    ///
    /// The seed is carried over as-is (possibly still the random sentinel)
    /// and thinking starts disabled; the orchestrator finalizes both.
    pub fn from_request(request: &GenerationRequest) -> Self {
        Self {
            caption: request.caption.clone(),
            lyrics: request.lyrics.clone(),
            duration: request.duration,
            bpm: request.bpm,
            key_scale: request.key_scale.clone(),
            time_signature: request.time_signature.clone(),
            vocal_language: request.vocal_language.clone(),
            inference_steps: request.inference_steps,
            guidance_scale: request.guidance_scale,
            seed: request.seed,
            thinking: false,
            use_format: request.use_format,
            batch_size: BATCH_SIZE,
            audio_format: request.audio_format,
        }
    }
}

/// In-memory audio data returned by a backend instead of a file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTensor {
    /// Interleaved samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Channel count the samples are interleaved for.
    pub channels: u16,
    /// Sample rate, if the backend reported one.
    pub sample_rate: Option<u32>,
}

/// One produced audio artifact plus the parameters realized for it.
///
/// A backend may hand back a file path, an in-memory tensor, or both;
/// the resolver decides how to turn it into bytes.
#[derive(Debug, Clone, Default)]
pub struct AudioArtifact {
    /// Path the backend claims to have written.
    pub path: Option<PathBuf>,
    /// In-memory audio, for backends that do not touch the filesystem.
    pub tensor: Option<AudioTensor>,
    /// Seed the backend actually used.
    pub seed: Option<i64>,
    /// Tempo the backend chose or detected.
    pub bpm: Option<u32>,
    /// Key/scale the backend chose or detected.
    pub key_scale: Option<String>,
}

impl AudioArtifact {
    /// Creates an artifact referencing a file written by the backend.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Creates an artifact carrying in-memory audio.
    pub fn from_tensor(tensor: AudioTensor) -> Self {
        Self {
            tensor: Some(tensor),
            ..Self::default()
        }
    }
}

/// Result of one synthesis invocation.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOutcome {
    /// Whether the backend considers the invocation successful.
    pub success: bool,
    /// Backend-reported error description when not successful.
    pub error: Option<String>,
    /// Produced artifacts. Empty on success is treated as failure upstream.
    pub artifacts: Vec<AudioArtifact>,
    /// Realized seed, when the backend reports one.
    pub seed: Option<i64>,
    /// Aggregate tempo, when the backend reports one.
    pub bpm: Option<u32>,
    /// Aggregate key/scale, when the backend reports one.
    pub key_scale: Option<String>,
}

impl SynthesisOutcome {
    /// Creates a successful outcome with the given artifacts.
    pub fn ok(artifacts: Vec<AudioArtifact>) -> Self {
        Self {
            success: true,
            artifacts,
            ..Self::default()
        }
    }

    /// Creates a failed outcome with a backend-reported reason.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// What the conditioning stage suggests for a request.
///
/// Every field is optional; the orchestrator merges a plan without
/// overriding what the caller set explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptPlan {
    /// Expanded/structured caption.
    pub caption: Option<String>,
    /// Expanded/structured lyrics.
    pub lyrics: Option<String>,
    /// Suggested tempo.
    pub bpm: Option<u32>,
    /// Suggested key/scale.
    pub key_scale: Option<String>,
    /// Suggested time signature.
    pub time_signature: Option<String>,
}

/// Required capability: produce audio for a spec, or fail.
pub trait SynthesisBackend: Send + Sync {
    /// Short adapter name for logs.
    fn name(&self) -> &'static str;

    /// Runs one generation. File output goes into `scratch`.
    ///
    /// Transport-level problems are `Err`; a backend that ran but judged
    /// the result unusable returns `Ok` with `success == false`.
    fn synthesize(&self, spec: &SynthesisSpec, scratch: &Path) -> Result<SynthesisOutcome>;
}

/// Optional capability: expand/condition a prompt before synthesis.
pub trait PromptConditioner: Send + Sync {
    /// Short adapter name for logs.
    fn name(&self) -> &'static str;

    /// Produces a plan for the request.
    fn condition(&self, request: &GenerationRequest) -> Result<PromptPlan>;
}

/// Probe-and-construct seam for synthesis backends.
///
/// `initialize` must verify the backend shape actually works before
/// returning a handle. The session tries providers in order and keeps
/// the first that succeeds.
pub trait SynthesisProvider: Send + Sync {
    /// Short provider name for logs and error messages.
    fn name(&self) -> &'static str;

    /// Probes and constructs the backend handle.
    fn initialize(&self, config: &WorkerConfig) -> Result<Arc<dyn SynthesisBackend>>;
}

/// Probe-and-construct seam for prompt conditioners.
pub trait ConditionerProvider: Send + Sync {
    /// Short provider name for logs and error messages.
    fn name(&self) -> &'static str;

    /// Probes and constructs the conditioner handle.
    fn initialize(&self, config: &WorkerConfig) -> Result<Arc<dyn PromptConditioner>>;
}
