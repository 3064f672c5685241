//! Generation pipeline.
//!
//! Orchestrates one request against the initialized backends: an optional
//! thinking stage that enriches the prompt, then the synthesis call itself.

use std::path::Path;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::{Result, WorkerError};
use crate::models::{PromptPlan, SessionHandles, SynthesisOutcome, SynthesisSpec};
use crate::types::GenerationRequest;

/// Runs the generation pipeline for a normalized request.
///
/// The thinking stage is strictly best-effort: when no conditioner is
/// available, or the conditioner errors, generation proceeds single-stage
/// and the caller never sees the difference. Synthesis failures are the
/// only errors that propagate.
///
/// # Example
///
/// ```ignore
/// use acestep_worker::generation::generate;
///
/// let outcome = generate(&request, &handles, scratch_dir.path())?;
/// let artifact = &outcome.artifacts[0];
/// ```
pub fn generate(
    request: &GenerationRequest,
    handles: &SessionHandles,
    scratch: &Path,
) -> Result<SynthesisOutcome> {
    let mut spec = SynthesisSpec::from_request(request);

    // Step 1: optional thinking stage
    if request.thinking {
        match &handles.conditioner {
            Some(conditioner) => match conditioner.condition(request) {
                Ok(plan) => {
                    debug!(conditioner = conditioner.name(), "applying prompt plan");
                    apply_plan(&mut spec, plan);
                    spec.thinking = true;
                }
                Err(e) => {
                    warn!("thinking stage failed, continuing single-stage: {}", e);
                }
            },
            None => {
                info!("thinking requested but no conditioning backend is available");
            }
        }
    }

    // Step 2: realize a random seed so the response can echo a concrete value
    if spec.seed < 0 {
        spec.seed = rand::thread_rng().gen_range(0..=i32::MAX as i64);
        debug!(seed = spec.seed, "realized random seed");
    }

    // Step 3: synthesize
    let mut outcome = handles.synthesizer.synthesize(&spec, scratch)?;
    if !outcome.success {
        let detail = outcome
            .error
            .take()
            .unwrap_or_else(|| "backend reported failure".to_string());
        return Err(WorkerError::generation_failed(detail));
    }
    if outcome.artifacts.is_empty() {
        return Err(WorkerError::generation_failed(
            "backend produced no audio artifacts",
        ));
    }

    // Step 4: backfill metadata the backend did not report
    if outcome.seed.is_none() {
        outcome.seed = Some(spec.seed);
    }
    if outcome.bpm.is_none() {
        outcome.bpm = spec.bpm;
    }
    if outcome.key_scale.is_none() {
        outcome.key_scale = spec.key_scale.clone();
    }

    Ok(outcome)
}

/// Merges a prompt plan into an outgoing synthesis spec.
///
/// The plan may rewrite caption and lyrics outright, but musical hints
/// only fill slots the request left empty, and duration is never touched.
fn apply_plan(spec: &mut SynthesisSpec, plan: PromptPlan) {
    if let Some(caption) = plan.caption {
        spec.caption = caption;
    }
    if let Some(lyrics) = plan.lyrics {
        spec.lyrics = lyrics;
    }
    if spec.bpm.is_none() {
        spec.bpm = plan.bpm;
    }
    if spec.key_scale.is_none() {
        spec.key_scale = plan.key_scale;
    }
    if spec.time_signature.is_none() {
        spec.time_signature = plan.time_signature;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AudioArtifact, PromptConditioner, SynthesisBackend};
    use std::sync::{Arc, Mutex};

    struct RecordingBackend {
        captured: Mutex<Option<SynthesisSpec>>,
        reply: fn() -> SynthesisOutcome,
    }

    impl RecordingBackend {
        fn new(reply: fn() -> SynthesisOutcome) -> Arc<Self> {
            Arc::new(Self {
                captured: Mutex::new(None),
                reply,
            })
        }

        fn captured(&self) -> SynthesisSpec {
            self.captured.lock().unwrap().clone().unwrap()
        }
    }

    impl SynthesisBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn synthesize(&self, spec: &SynthesisSpec, _scratch: &Path) -> Result<SynthesisOutcome> {
            *self.captured.lock().unwrap() = Some(spec.clone());
            Ok((self.reply)())
        }
    }

    fn one_artifact() -> SynthesisOutcome {
        SynthesisOutcome::ok(vec![AudioArtifact::from_path("/tmp/scratch/output.mp3")])
    }

    struct FixedConditioner(PromptPlan);

    impl PromptConditioner for FixedConditioner {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn condition(&self, _request: &GenerationRequest) -> Result<PromptPlan> {
            Ok(self.0.clone())
        }
    }

    struct BrokenConditioner;

    impl PromptConditioner for BrokenConditioner {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn condition(&self, _request: &GenerationRequest) -> Result<PromptPlan> {
            Err(WorkerError::internal("planner model not loaded"))
        }
    }

    fn handles(
        backend: Arc<RecordingBackend>,
        conditioner: Option<Arc<dyn PromptConditioner>>,
    ) -> SessionHandles {
        SessionHandles {
            synthesizer: backend,
            conditioner,
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            thinking: true,
            seed: 42,
            ..GenerationRequest::default()
        }
    }

    #[test]
    fn thinking_degrades_silently_without_conditioner() {
        let backend = RecordingBackend::new(one_artifact);
        let outcome = generate(
            &request(),
            &handles(backend.clone(), None),
            Path::new("/tmp/scratch"),
        )
        .unwrap();

        assert!(outcome.success);
        assert!(!backend.captured().thinking);
    }

    #[test]
    fn thinking_degrades_silently_when_conditioner_errors() {
        let backend = RecordingBackend::new(one_artifact);
        let outcome = generate(
            &request(),
            &handles(backend.clone(), Some(Arc::new(BrokenConditioner))),
            Path::new("/tmp/scratch"),
        )
        .unwrap();

        assert!(outcome.success);
        assert!(!backend.captured().thinking);
    }

    #[test]
    fn plan_fills_missing_hints_only() {
        let mut req = request();
        req.bpm = Some(140);
        let plan = PromptPlan {
            caption: Some("dreamy synthwave, wide pads".to_string()),
            bpm: Some(90),
            key_scale: Some("A minor".to_string()),
            ..PromptPlan::default()
        };

        let backend = RecordingBackend::new(one_artifact);
        generate(
            &req,
            &handles(backend.clone(), Some(Arc::new(FixedConditioner(plan)))),
            Path::new("/tmp/scratch"),
        )
        .unwrap();

        let spec = backend.captured();
        assert_eq!(spec.caption, "dreamy synthwave, wide pads");
        assert_eq!(spec.bpm, Some(140));
        assert_eq!(spec.key_scale.as_deref(), Some("A minor"));
        assert!(spec.thinking);
    }

    #[test]
    fn plan_never_changes_duration() {
        let mut req = request();
        req.duration = 60;
        let backend = RecordingBackend::new(one_artifact);
        generate(
            &req,
            &handles(
                backend.clone(),
                Some(Arc::new(FixedConditioner(PromptPlan::default()))),
            ),
            Path::new("/tmp/scratch"),
        )
        .unwrap();

        assert_eq!(backend.captured().duration, 60);
    }

    #[test]
    fn backend_failure_becomes_generation_error() {
        let backend = RecordingBackend::new(|| SynthesisOutcome::failure("CUDA out of memory"));
        let err = generate(&request(), &handles(backend, None), Path::new("/tmp/scratch"))
            .unwrap_err();

        assert_eq!(err.code, crate::error::ErrorCode::GenerationFailed);
        assert!(err.message.contains("CUDA out of memory"));
    }

    #[test]
    fn empty_artifact_list_is_an_error() {
        let backend = RecordingBackend::new(|| SynthesisOutcome::ok(Vec::new()));
        let err = generate(&request(), &handles(backend, None), Path::new("/tmp/scratch"))
            .unwrap_err();

        assert_eq!(err.code, crate::error::ErrorCode::GenerationFailed);
    }

    #[test]
    fn random_seed_is_realized_before_synthesis() {
        let mut req = request();
        req.seed = -1;
        let backend = RecordingBackend::new(one_artifact);
        let outcome = generate(&req, &handles(backend.clone(), None), Path::new("/tmp/scratch"))
            .unwrap();

        let sent = backend.captured().seed;
        assert!(sent >= 0);
        assert_eq!(outcome.seed, Some(sent));
    }

    #[test]
    fn explicit_seed_passes_through() {
        let backend = RecordingBackend::new(one_artifact);
        let outcome = generate(
            &request(),
            &handles(backend.clone(), None),
            Path::new("/tmp/scratch"),
        )
        .unwrap();

        assert_eq!(backend.captured().seed, 42);
        assert_eq!(outcome.seed, Some(42));
    }

    #[test]
    fn backend_metadata_wins_over_backfill() {
        let backend = RecordingBackend::new(|| {
            let mut outcome = one_artifact();
            outcome.seed = Some(777);
            outcome.bpm = Some(118);
            outcome
        });
        let mut req = request();
        req.bpm = Some(90);

        let outcome = generate(&req, &handles(backend, None), Path::new("/tmp/scratch")).unwrap();
        assert_eq!(outcome.seed, Some(777));
        assert_eq!(outcome.bpm, Some(118));
    }
}
