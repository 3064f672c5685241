//! acestep-worker: serverless music generation worker driving ACE-Step backends.
//!
//! This library turns loosely-typed generation jobs into audio responses:
//! parameters are normalized rather than rejected, backends are initialized
//! lazily and retried across jobs, and every job produces exactly one JSON
//! payload, success or failure.
//!
//! # Modules
//!
//! - [`types`]: Request normalization (GenerationRequest, AudioFormat)
//! - [`config`]: Runtime configuration from ACESTEP_* environment variables
//! - [`error`]: Error codes and the worker error type
//! - [`models`]: Backend traits, adapters, and the lazy model session
//! - [`generation`]: Per-request pipeline and artifact resolution
//! - [`audio`]: WAV and MP3 encoding
//! - [`worker`]: Job handler and the stdin/stdout worker loop
//!
//! # Example
//!
//! ```rust,ignore
//! use acestep_worker::{
//!     config::WorkerConfig,
//!     models::{default_conditioner_providers, default_synthesis_providers, ModelSession},
//!     worker::handle,
//! };
//!
//! let config = WorkerConfig::from_env();
//! let session = ModelSession::new(
//!     default_synthesis_providers(&config),
//!     default_conditioner_providers(&config),
//! );
//!
//! let job = serde_json::json!({"input": {"caption": "lofi beats", "duration": 60}});
//! let response = handle(&job, &session, &config);
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod models;
pub mod types;
pub mod worker;

// Re-export commonly used types at crate root for convenience
pub use config::{AttentionBackend, BackendSelect, Device, WorkerConfig};
pub use error::{ErrorCode, Result, WorkerError};
pub use models::{ModelSession, SessionHandles};
pub use types::{AudioFormat, GenerationRequest};
