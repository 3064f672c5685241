//! Process-wide model session.
//!
//! Owns the lazily-initialized handles to the synthesis backend (required)
//! and the prompt conditioner (optional). The lifecycle is deliberately
//! asymmetric: a failed required-backend initialization is never cached, so
//! the next request retries it, while a failed conditioner initialization
//! is cached as permanently absent and thinking mode degrades for the rest
//! of the process.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use crate::config::WorkerConfig;
use crate::error::{Result, WorkerError};

use super::backend::{
    ConditionerProvider, PromptConditioner, SynthesisBackend, SynthesisProvider,
};

/// Cheap-to-clone handles returned by [`ModelSession::acquire`].
#[derive(Clone)]
pub struct SessionHandles {
    /// The required audio-synthesis backend.
    pub synthesizer: Arc<dyn SynthesisBackend>,
    /// The optional language-conditioning backend.
    pub conditioner: Option<Arc<dyn PromptConditioner>>,
}

/// Optional-capability slot with its attempt recorded.
enum ConditionerSlot {
    /// Initialization has not been attempted yet.
    Untried,
    /// Initialized and usable.
    Ready(Arc<dyn PromptConditioner>),
    /// Initialization failed or nothing was configured; never retried.
    Unavailable,
}

struct SessionState {
    synthesizer: Option<Arc<dyn SynthesisBackend>>,
    conditioner: ConditionerSlot,
}

/// Shared, lazily-initialized session over the generation backends.
///
/// `acquire` performs first-time initialization under a single lock, so
/// concurrent requests never duplicate the expensive load: one of them
/// initializes while the others block and then read the cached handles.
pub struct ModelSession {
    synthesis_providers: Vec<Box<dyn SynthesisProvider>>,
    conditioner_providers: Vec<Box<dyn ConditionerProvider>>,
    state: Mutex<SessionState>,
}

impl ModelSession {
    /// Creates a session over the given provider lists.
    ///
    /// Providers are probed in order; the first whose `initialize`
    /// succeeds supplies the handle.
    pub fn new(
        synthesis_providers: Vec<Box<dyn SynthesisProvider>>,
        conditioner_providers: Vec<Box<dyn ConditionerProvider>>,
    ) -> Self {
        Self {
            synthesis_providers,
            conditioner_providers,
            state: Mutex::new(SessionState {
                synthesizer: None,
                conditioner: ConditionerSlot::Untried,
            }),
        }
    }

    /// Returns ready backend handles, initializing on first use.
    ///
    /// On required-backend failure the session stays uninitialized and the
    /// error propagates; the next call retries from scratch. The optional
    /// conditioner is attempted once, after the required backend succeeds,
    /// and a failure there only logs and leaves the handle absent.
    pub fn acquire(&self, config: &WorkerConfig) -> Result<SessionHandles> {
        let mut state = self.lock_state();

        let synthesizer = match state.synthesizer {
            Some(ref handle) => Arc::clone(handle),
            None => {
                let handle = self.init_synthesizer(config)?;
                state.synthesizer = Some(Arc::clone(&handle));
                handle
            }
        };

        if matches!(state.conditioner, ConditionerSlot::Untried) {
            state.conditioner = self.init_conditioner(config);
        }

        let conditioner = match state.conditioner {
            ConditionerSlot::Ready(ref handle) => Some(Arc::clone(handle)),
            _ => None,
        };

        Ok(SessionHandles {
            synthesizer,
            conditioner,
        })
    }

    /// Returns true if the required backend has been initialized.
    pub fn is_ready(&self) -> bool {
        self.lock_state().synthesizer.is_some()
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        // A panicked holder cannot leave the state half-written: both slots
        // are assigned whole values, so recover the guard and keep going.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn init_synthesizer(&self, config: &WorkerConfig) -> Result<Arc<dyn SynthesisBackend>> {
        if self.synthesis_providers.is_empty() {
            return Err(WorkerError::model_init_failed(
                "no synthesis providers configured",
            ));
        }

        let mut failures = Vec::new();
        for provider in &self.synthesis_providers {
            info!(provider = provider.name(), "initializing synthesis backend");
            match provider.initialize(config) {
                Ok(handle) => {
                    info!(backend = handle.name(), "synthesis backend ready");
                    return Ok(handle);
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e.message, "synthesis provider failed");
                    failures.push(format!("{}: {}", provider.name(), e.message));
                }
            }
        }

        Err(WorkerError::model_init_failed(failures.join("; ")))
    }

    fn init_conditioner(&self, config: &WorkerConfig) -> ConditionerSlot {
        if self.conditioner_providers.is_empty() {
            info!("no conditioning backend configured; thinking mode unavailable");
            return ConditionerSlot::Unavailable;
        }

        for provider in &self.conditioner_providers {
            match provider.initialize(config) {
                Ok(handle) => {
                    info!(conditioner = handle.name(), "conditioning backend ready");
                    return ConditionerSlot::Ready(handle);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e.message,
                        "conditioning backend unavailable, continuing without thinking mode"
                    );
                }
            }
        }

        ConditionerSlot::Unavailable
    }
}
