//! Command-line generator adapter.
//!
//! Fallback backend that shells out to the `acestep` CLI for each request.
//! Slower than the daemon because the model is reloaded per invocation, but
//! it needs nothing resident on the host. The provider resolves the program
//! on PATH and probes it with `--version` before committing to it.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::config::WorkerConfig;
use crate::error::{ErrorCode, Result, WorkerError};

use super::backend::{
    AudioArtifact, SynthesisBackend, SynthesisOutcome, SynthesisProvider, SynthesisSpec,
};

/// Locates `program` either as an explicit path or by searching PATH.
fn resolve_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

/// Collapses a stderr capture to its last few meaningful lines.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(3);
    lines[start..].join(" | ")
}

/// Synthesis backend that runs the CLI generator per request.
pub struct CliBackend {
    program: PathBuf,
    config_id: String,
    checkpoint: PathBuf,
    device: &'static str,
    attention: &'static str,
}

impl CliBackend {
    fn from_config(program: PathBuf, config: &WorkerConfig) -> Self {
        Self {
            program,
            config_id: config.config_id.clone(),
            checkpoint: config.effective_checkpoint_path(),
            device: config.device.as_str(),
            attention: config.attention.as_str(),
        }
    }

    fn build_args(&self, spec: &SynthesisSpec, output: &Path) -> Vec<String> {
        let mut args = vec![
            "--caption".to_string(),
            spec.caption.clone(),
            "--lyrics".to_string(),
            spec.lyrics.clone(),
            "--duration".to_string(),
            spec.duration.to_string(),
            "--output".to_string(),
            output.to_string_lossy().into_owned(),
            "--steps".to_string(),
            spec.inference_steps.to_string(),
            "--guidance".to_string(),
            spec.guidance_scale.to_string(),
            "--language".to_string(),
            spec.vocal_language.clone(),
            "--format".to_string(),
            spec.audio_format.as_str().to_string(),
            "--checkpoint".to_string(),
            self.checkpoint.to_string_lossy().into_owned(),
        ];

        if let Some(bpm) = spec.bpm {
            args.push("--bpm".to_string());
            args.push(bpm.to_string());
        }
        if let Some(key_scale) = &spec.key_scale {
            args.push("--key-scale".to_string());
            args.push(key_scale.clone());
        }
        if let Some(time_signature) = &spec.time_signature {
            args.push("--time-signature".to_string());
            args.push(time_signature.clone());
        }
        if spec.seed >= 0 {
            args.push("--seed".to_string());
            args.push(spec.seed.to_string());
        }
        if spec.thinking {
            args.push("--thinking".to_string());
        }
        if spec.use_format {
            args.push("--use-format".to_string());
        }

        args
    }
}

impl SynthesisBackend for CliBackend {
    fn name(&self) -> &'static str {
        "cli"
    }

    fn synthesize(&self, spec: &SynthesisSpec, scratch: &Path) -> Result<SynthesisOutcome> {
        let output_path = scratch.join(format!("output.{}", spec.audio_format.extension()));
        let args = self.build_args(spec, &output_path);

        let output = Command::new(&self.program)
            .args(&args)
            .env("ACESTEP_CONFIG", &self.config_id)
            .env("ACESTEP_DEVICE", self.device)
            .env("ACESTEP_ATTENTION", self.attention)
            .output()
            .map_err(|e| {
                WorkerError::with_source(
                    ErrorCode::GenerationFailed,
                    format!("failed to launch {}", self.program.display()),
                    e,
                )
            })?;

        if !output.status.success() {
            return Ok(SynthesisOutcome::failure(format!(
                "cli exited with {}: {}",
                output.status,
                stderr_tail(&output.stderr)
            )));
        }

        let mut outcome = SynthesisOutcome::ok(vec![AudioArtifact::from_path(output_path)]);
        if spec.seed >= 0 {
            outcome.seed = Some(spec.seed);
        }
        outcome.bpm = spec.bpm;
        Ok(outcome)
    }
}

/// Probes the CLI generator and constructs [`CliBackend`].
pub struct CliProvider;

impl SynthesisProvider for CliProvider {
    fn name(&self) -> &'static str {
        "cli"
    }

    fn initialize(&self, config: &WorkerConfig) -> Result<Arc<dyn SynthesisBackend>> {
        let program = resolve_program(&config.cli_program).ok_or_else(|| {
            WorkerError::new(
                ErrorCode::ModelInitFailed,
                format!("cli program '{}' not found", config.cli_program),
            )
        })?;

        let probe = Command::new(&program).arg("--version").output().map_err(|e| {
            WorkerError::with_source(
                ErrorCode::ModelInitFailed,
                format!("failed to launch {}", program.display()),
                e,
            )
        })?;
        if !probe.status.success() {
            return Err(WorkerError::new(
                ErrorCode::ModelInitFailed,
                format!(
                    "'{} --version' exited with {}",
                    program.display(),
                    probe.status
                ),
            ));
        }

        Ok(Arc::new(CliBackend::from_config(program, config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AudioFormat;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    fn spec() -> SynthesisSpec {
        SynthesisSpec {
            caption: "ambient piano".to_string(),
            lyrics: "[instrumental]".to_string(),
            duration: 45,
            bpm: None,
            key_scale: None,
            time_signature: None,
            vocal_language: "en".to_string(),
            inference_steps: 8,
            guidance_scale: 7.0,
            seed: 42,
            thinking: false,
            use_format: false,
            batch_size: 1,
            audio_format: AudioFormat::Wav,
        }
    }

    fn backend(program: PathBuf) -> CliBackend {
        CliBackend {
            program,
            config_id: "acestep-v15-turbo".to_string(),
            checkpoint: PathBuf::from("/models"),
            device: "auto",
            attention: "portable",
        }
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "{}", body).unwrap();
        drop(file);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn build_args_skips_absent_hints() {
        let args =
            backend(PathBuf::from("acestep")).build_args(&spec(), Path::new("/tmp/x/output.wav"));

        assert!(args.contains(&"--caption".to_string()));
        assert!(args.contains(&"--seed".to_string()));
        assert!(!args.contains(&"--bpm".to_string()));
        assert!(!args.contains(&"--thinking".to_string()));

        let duration_at = args.iter().position(|a| a == "--duration").unwrap();
        assert_eq!(args[duration_at + 1], "45");
        let checkpoint_at = args.iter().position(|a| a == "--checkpoint").unwrap();
        assert_eq!(args[checkpoint_at + 1], "/models");
    }

    #[test]
    fn build_args_includes_hints_when_present() {
        let mut s = spec();
        s.bpm = Some(120);
        s.key_scale = Some("C major".to_string());
        s.thinking = true;
        let args = backend(PathBuf::from("acestep")).build_args(&s, Path::new("/tmp/x/output.wav"));

        let bpm_at = args.iter().position(|a| a == "--bpm").unwrap();
        assert_eq!(args[bpm_at + 1], "120");
        assert!(args.contains(&"--key-scale".to_string()));
        assert!(args.contains(&"--thinking".to_string()));
    }

    #[test]
    fn build_args_omits_negative_seed() {
        let mut s = spec();
        s.seed = -1;
        let args = backend(PathBuf::from("acestep")).build_args(&s, Path::new("/tmp/x/output.wav"));
        assert!(!args.contains(&"--seed".to_string()));
    }

    #[test]
    fn resolve_program_searches_path() {
        assert!(resolve_program("sh").is_some());
        assert!(resolve_program("no-such-program-acestep-test").is_none());
    }

    #[test]
    fn provider_fails_when_program_missing() {
        let config = WorkerConfig {
            cli_program: "no-such-program-acestep-test".to_string(),
            ..WorkerConfig::default()
        };
        let err = CliProvider.initialize(&config).err().expect("probe should fail");
        assert_eq!(err.code, ErrorCode::ModelInitFailed);
    }

    #[test]
    fn synthesize_reports_artifact_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "fake-acestep",
            r#"while [ $# -gt 0 ]; do if [ "$1" = "--output" ]; then out="$2"; fi; shift; done
printf 'RIFF' > "$out""#,
        );

        let outcome = backend(script).synthesize(&spec(), dir.path()).unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.seed, Some(42));
        let artifact_path = outcome.artifacts[0].path.as_ref().unwrap();
        assert!(artifact_path.exists());
        assert_eq!(artifact_path.extension().unwrap(), "wav");
    }

    #[test]
    fn synthesize_surfaces_stderr_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "fake-acestep",
            r#"echo "model shards missing" >&2
exit 3"#,
        );

        let outcome = backend(script).synthesize(&spec(), dir.path()).unwrap();

        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert!(error.contains("model shards missing"));
        assert!(error.contains("exit"));
    }
}
