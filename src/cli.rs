//! CLI argument parser for one-shot generation.
//!
//! Provides a command-line interface for testing music generation
//! without a serverless supervisor feeding jobs over stdin.

use std::path::PathBuf;

use clap::Parser;
use serde_json::{json, Value};

use crate::types::AudioFormat;

/// acestep-worker: serverless ACE-Step music generation worker
#[derive(Parser, Debug)]
#[command(name = "acestep-worker")]
#[command(about = "Serverless music generation worker driving ACE-Step backends")]
#[command(version)]
pub struct Cli {
    /// Text description of the music to generate
    #[arg(short, long)]
    pub caption: Option<String>,

    /// Lyrics to sing, or "[instrumental]" for none
    #[arg(short, long)]
    pub lyrics: Option<String>,

    /// Duration of audio to generate in seconds (10-600)
    #[arg(short, long)]
    pub duration: Option<u32>,

    /// Tempo hint in beats per minute (30-300)
    #[arg(long)]
    pub bpm: Option<u32>,

    /// Key and scale hint, e.g. "C major"
    #[arg(long)]
    pub key_scale: Option<String>,

    /// Random seed for reproducible generation (-1 picks one)
    #[arg(short, long)]
    pub seed: Option<i64>,

    /// Number of diffusion steps (1-20)
    #[arg(long)]
    pub steps: Option<u32>,

    /// Guidance scale for classifier-free guidance
    #[arg(long)]
    pub guidance: Option<f64>,

    /// Disable the prompt-enrichment thinking stage
    #[arg(long)]
    pub no_thinking: bool,

    /// Audio format: mp3, wav, or flac
    #[arg(short, long)]
    pub format: Option<String>,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Run in worker mode (one JSON job per stdin line)
    #[arg(long)]
    pub worker: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Returns true if running in worker mode.
    pub fn is_worker_mode(&self) -> bool {
        self.worker
    }

    /// Returns true if generating a single clip from the arguments.
    pub fn is_oneshot_mode(&self) -> bool {
        !self.worker && self.caption.is_some()
    }

    /// Returns the requested audio format, defaulting like the worker does.
    pub fn audio_format(&self) -> AudioFormat {
        self.format
            .as_deref()
            .and_then(AudioFormat::parse)
            .unwrap_or_default()
    }

    /// Returns the effective output path.
    ///
    /// Defaults to "output.<format>" in the current directory.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("output.{}", self.audio_format().extension())))
    }

    /// Builds the job object the request handler expects.
    ///
    /// Only arguments that were actually given end up in the job, so the
    /// normalizer applies the same defaults as in worker mode.
    pub fn to_job_value(&self) -> Value {
        let mut params = serde_json::Map::new();
        if let Some(caption) = &self.caption {
            params.insert("caption".to_string(), json!(caption));
        }
        if let Some(lyrics) = &self.lyrics {
            params.insert("lyrics".to_string(), json!(lyrics));
        }
        if let Some(duration) = self.duration {
            params.insert("duration".to_string(), json!(duration));
        }
        if let Some(bpm) = self.bpm {
            params.insert("bpm".to_string(), json!(bpm));
        }
        if let Some(key_scale) = &self.key_scale {
            params.insert("key_scale".to_string(), json!(key_scale));
        }
        if let Some(seed) = self.seed {
            params.insert("seed".to_string(), json!(seed));
        }
        if let Some(steps) = self.steps {
            params.insert("inference_steps".to_string(), json!(steps));
        }
        if let Some(guidance) = self.guidance {
            params.insert("guidance_scale".to_string(), json!(guidance));
        }
        if self.no_thinking {
            params.insert("thinking".to_string(), json!(false));
        }
        if let Some(format) = &self.format {
            params.insert("audio_format".to_string(), json!(format));
        }
        Value::Object(params)
    }
}
