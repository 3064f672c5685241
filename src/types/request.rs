//! Generation request normalization.
//!
//! Turns the raw, untyped job input into a fully populated
//! [`GenerationRequest`]. The contract is deliberately permissive: bad
//! input is coerced to the nearest valid value, never rejected, so a
//! malformed job still produces music instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caption used when the job provides neither `caption` nor `tags`.
pub const DEFAULT_CAPTION: &str = "pop, upbeat, energetic";

/// Lyrics sentinel meaning "no vocals".
pub const INSTRUMENTAL_LYRICS: &str = "[instrumental]";

/// Default track length in seconds.
pub const DEFAULT_DURATION_SECS: u32 = 120;

/// Minimum track length in seconds.
pub const MIN_DURATION_SECS: u32 = 10;

/// Maximum track length in seconds.
pub const MAX_DURATION_SECS: u32 = 600;

/// Default diffusion step count, tuned for the turbo backend.
pub const DEFAULT_INFERENCE_STEPS: u32 = 8;

/// Minimum diffusion step count.
pub const MIN_INFERENCE_STEPS: u32 = 1;

/// Maximum diffusion step count.
pub const MAX_INFERENCE_STEPS: u32 = 20;

/// Minimum plausible tempo.
pub const MIN_BPM: u32 = 30;

/// Maximum plausible tempo.
pub const MAX_BPM: u32 = 300;

/// Default classifier-free guidance scale.
pub const DEFAULT_GUIDANCE_SCALE: f64 = 7.0;

/// Seed sentinel meaning "pick a random seed downstream".
pub const RANDOM_SEED: i64 = -1;

/// Default lyric language code.
pub const DEFAULT_VOCAL_LANGUAGE: &str = "en";

/// Output container formats accepted from the job input.
///
/// Anything outside this whitelist silently falls back to [`AudioFormat::Mp3`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MP3, the default delivery format.
    #[default]
    Mp3,
    /// Uncompressed WAV.
    Wav,
    /// FLAC, produced by the synthesis backend itself.
    Flac,
}

impl AudioFormat {
    /// Returns the string representation of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Parses a format from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            _ => None,
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fully normalized music-generation request.
///
/// Every field is in range after [`GenerationRequest::from_value`]; the
/// rest of the pipeline never re-validates.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Free-form style/mood/instrumentation description.
    pub caption: String,
    /// Lyrics with optional section markers, or [`INSTRUMENTAL_LYRICS`].
    pub lyrics: String,
    /// Track length in seconds, clamped to [10, 600].
    pub duration: u32,
    /// Tempo hint, clamped to [30, 300]. Absent lets the backend infer.
    pub bpm: Option<u32>,
    /// Key/scale hint, e.g. "C major".
    pub key_scale: Option<String>,
    /// Time signature hint, e.g. "4/4".
    pub time_signature: Option<String>,
    /// Lyric language code.
    pub vocal_language: String,
    /// Whether to run the language-conditioning stage.
    pub thinking: bool,
    /// Diffusion step count, clamped to [1, 20].
    pub inference_steps: u32,
    /// Classifier-free guidance scale.
    pub guidance_scale: f64,
    /// Seed; [`RANDOM_SEED`] (or any negative) requests a random seed.
    pub seed: i64,
    /// Whether the conditioning stage should apply strict output formatting.
    pub use_format: bool,
    /// Requested output container.
    pub audio_format: AudioFormat,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            caption: DEFAULT_CAPTION.to_string(),
            lyrics: INSTRUMENTAL_LYRICS.to_string(),
            duration: DEFAULT_DURATION_SECS,
            bpm: None,
            key_scale: None,
            time_signature: None,
            vocal_language: DEFAULT_VOCAL_LANGUAGE.to_string(),
            thinking: true,
            inference_steps: DEFAULT_INFERENCE_STEPS,
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
            seed: RANDOM_SEED,
            use_format: false,
            audio_format: AudioFormat::default(),
        }
    }
}

impl GenerationRequest {
    /// Normalizes a raw job parameter map into a well-formed request.
    ///
    /// Accepts the legacy aliases `tags` (caption), `think_mode` (thinking)
    /// and `steps` (inference_steps); the modern field wins when both are
    /// present. A non-object input yields the all-defaults request.
    pub fn from_value(input: &Value) -> Self {
        let mut request = Self::default();

        let map = match input.as_object() {
            Some(m) => m,
            None => return request,
        };

        if let Some(caption) = coerce_string(map.get("caption"))
            .or_else(|| coerce_string(map.get("tags")))
        {
            request.caption = caption;
        }

        if let Some(lyrics) = coerce_string(map.get("lyrics")) {
            request.lyrics = lyrics;
        }

        if let Some(duration) = coerce_i64(map.get("duration")) {
            request.duration = clamp_u32(duration, MIN_DURATION_SECS, MAX_DURATION_SECS);
        }

        if let Some(bpm) = coerce_i64(map.get("bpm")) {
            request.bpm = Some(clamp_u32(bpm, MIN_BPM, MAX_BPM));
        }

        request.key_scale = coerce_string(map.get("key_scale"));
        request.time_signature = coerce_string(map.get("time_signature"));

        if let Some(language) = coerce_string(map.get("vocal_language")) {
            request.vocal_language = language;
        }

        if let Some(thinking) = coerce_bool(map.get("thinking"))
            .or_else(|| coerce_bool(map.get("think_mode")))
        {
            request.thinking = thinking;
        }

        if let Some(steps) = coerce_i64(map.get("inference_steps"))
            .or_else(|| coerce_i64(map.get("steps")))
        {
            request.inference_steps =
                clamp_u32(steps, MIN_INFERENCE_STEPS, MAX_INFERENCE_STEPS);
        }

        if let Some(guidance) = coerce_f64(map.get("guidance_scale")) {
            if guidance.is_finite() && guidance > 0.0 {
                request.guidance_scale = guidance;
            }
        }

        if let Some(seed) = coerce_i64(map.get("seed")) {
            request.seed = seed;
        }

        if let Some(use_format) = coerce_bool(map.get("use_format")) {
            request.use_format = use_format;
        }

        if let Some(format) = coerce_string(map.get("audio_format"))
            .or_else(|| coerce_string(map.get("format")))
            .and_then(|s| AudioFormat::parse(&s))
        {
            request.audio_format = format;
        }

        request
    }

    /// Returns true if the seed requests randomization.
    pub fn wants_random_seed(&self) -> bool {
        self.seed < 0
    }
}

/// Coerces a JSON value to an integer, accepting numbers and numeric strings.
fn coerce_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
        }
        _ => None,
    }
}

/// Coerces a JSON value to a float, accepting numbers and numeric strings.
fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Coerces a JSON value to a bool, accepting booleans and "true"/"false".
fn coerce_bool(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Coerces a JSON value to a non-empty trimmed string.
fn coerce_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

/// Clamps an i64 into a u32 range.
fn clamp_u32(value: i64, min: u32, max: u32) -> u32 {
    value.clamp(min as i64, max as i64) as u32
}
