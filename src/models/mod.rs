//! Generation backend components.
//!
//! This module contains the backend abstraction and its adapters:
//! - [`SynthesisBackend`](backend::SynthesisBackend): audio generation capability
//! - [`PromptConditioner`](backend::PromptConditioner): optional thinking-stage planner
//! - [`ModelSession`](session::ModelSession): lazy, retry-aware backend lifecycle
//! - [`DaemonBackend`](daemon::DaemonBackend): resident daemon over a Unix socket
//! - [`CliBackend`](subprocess::CliBackend): per-request CLI subprocess

pub mod backend;
pub mod daemon;
pub mod session;
pub mod subprocess;

// Re-export commonly used types
pub use backend::{
    AudioArtifact, AudioTensor, ConditionerProvider, PromptConditioner, PromptPlan,
    SynthesisBackend, SynthesisOutcome, SynthesisProvider, SynthesisSpec, BATCH_SIZE,
};
pub use daemon::{DaemonBackend, DaemonConditionerProvider, DaemonProvider};
pub use session::{ModelSession, SessionHandles};
pub use subprocess::{CliBackend, CliProvider};

use crate::config::{BackendSelect, WorkerConfig};

/// Builds the synthesis provider list for `config`, in probe order.
///
/// Auto tries the daemon first and falls back to the CLI. An explicit
/// selection pins the list to that single adapter.
pub fn default_synthesis_providers(config: &WorkerConfig) -> Vec<Box<dyn SynthesisProvider>> {
    match config.backend {
        BackendSelect::Auto => vec![Box::new(DaemonProvider), Box::new(CliProvider)],
        BackendSelect::Daemon => vec![Box::new(DaemonProvider)],
        BackendSelect::Cli => vec![Box::new(CliProvider)],
    }
}

/// Builds the conditioner provider list for `config`.
///
/// Only the daemon exposes a plan command; with the CLI backend pinned
/// there is nothing to condition with and the list is empty.
pub fn default_conditioner_providers(config: &WorkerConfig) -> Vec<Box<dyn ConditionerProvider>> {
    match config.backend {
        BackendSelect::Cli => Vec::new(),
        _ => vec![Box::new(DaemonConditionerProvider)],
    }
}
