//! Job loop over stdin/stdout.
//!
//! Reads one JSON job per line and writes one JSON response per line,
//! flushing after each so a supervising process sees replies immediately.

use std::io::{self, BufRead, Write};

use tracing::{error, info};

use crate::config::WorkerConfig;
use crate::error::Result;
use crate::models::ModelSession;

use super::handler::handle;
use super::types::ResponsePayload;

/// Runs the worker loop until stdin closes.
pub fn run_worker(session: &ModelSession, config: &WorkerConfig) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let reader = stdin.lock();

    info!("worker started, reading jobs from stdin");

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("error reading stdin: {}", e);
                break;
            }
        };

        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }

        let response = process_line(&line, session, config);
        writeln!(stdout, "{}", response).ok();
        stdout.flush().ok();
    }

    info!("worker stopped");
    Ok(())
}

/// Processes a single job line into a response line.
fn process_line(line: &str, session: &ModelSession, config: &WorkerConfig) -> String {
    let job: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            let failure = ResponsePayload::failure(format!("invalid job: {}", e));
            return encode_response(&failure);
        }
    };

    encode_response(&handle(&job, session, config))
}

fn encode_response(response: &ResponsePayload) -> String {
    serde_json::to_string(response)
        .unwrap_or_else(|_| r#"{"error":"failed to encode response"}"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use crate::models::{
        AudioArtifact, SynthesisBackend, SynthesisOutcome, SynthesisProvider, SynthesisSpec,
    };
    use std::path::Path;
    use std::sync::Arc;

    struct TinyBackend;

    impl SynthesisBackend for TinyBackend {
        fn name(&self) -> &'static str {
            "tiny"
        }

        fn synthesize(
            &self,
            spec: &SynthesisSpec,
            scratch: &Path,
        ) -> crate::error::Result<SynthesisOutcome> {
            let path = scratch.join(format!("output.{}", spec.audio_format.extension()));
            std::fs::write(&path, b"audio").unwrap();
            Ok(SynthesisOutcome::ok(vec![AudioArtifact::from_path(path)]))
        }
    }

    struct TinyProvider {
        fail: bool,
    }

    impl SynthesisProvider for TinyProvider {
        fn name(&self) -> &'static str {
            "tiny"
        }

        fn initialize(
            &self,
            _config: &WorkerConfig,
        ) -> crate::error::Result<Arc<dyn SynthesisBackend>> {
            if self.fail {
                return Err(WorkerError::model_init_failed("unavailable"));
            }
            Ok(Arc::new(TinyBackend))
        }
    }

    fn test_session(fail: bool) -> ModelSession {
        ModelSession::new(vec![Box::new(TinyProvider { fail })], Vec::new())
    }

    #[test]
    fn process_valid_job() {
        let session = test_session(false);
        let response = process_line(
            r#"{"input": {"caption": "lofi", "duration": 30}}"#,
            &session,
            &WorkerConfig::default(),
        );

        assert!(response.contains("audio_base64"));
        assert!(response.contains("\"duration\":30"));
    }

    #[test]
    fn process_invalid_json() {
        let session = test_session(false);
        let response = process_line("not json", &session, &WorkerConfig::default());

        assert!(response.contains("error"));
        assert!(response.contains("invalid job"));
    }

    #[test]
    fn process_job_with_unavailable_backend() {
        let session = test_session(true);
        let response = process_line(r#"{"caption": "lofi"}"#, &session, &WorkerConfig::default());

        assert!(response.contains("MODEL_INIT_FAILED"));
        assert!(!response.contains("audio_base64"));
    }
}
