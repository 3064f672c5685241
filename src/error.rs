//! Error types for the worker.
//!
//! Defines all error codes and types used throughout the worker for
//! consistent error handling and reporting.

use std::fmt;

/// Error codes surfaced in worker error responses.
///
/// These codes prefix every error message so operators can grep logs
/// and callers can pattern-match specific failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Required synthesis backend could not be initialized.
    /// Trigger: no backend reachable, or the backend's own load failed.
    ModelInitFailed,

    /// The synthesis backend ran but reported failure or produced nothing.
    /// Trigger: backend returned success=false, crashed, or emitted zero artifacts.
    GenerationFailed,

    /// No audio bytes could be recovered from the generation result.
    /// Trigger: expected output file missing and no tensor data to encode.
    NoArtifact,

    /// Encoding an in-memory tensor to the requested container failed.
    /// Trigger: no encoder compiled in for the format, or the encoder errored.
    EncodeFailed,

    /// Unclassified internal failure.
    /// Trigger: scratch directory creation, I/O, or serialization problems.
    Internal,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ModelInitFailed => "MODEL_INIT_FAILED",
            ErrorCode::GenerationFailed => "GENERATION_FAILED",
            ErrorCode::NoArtifact => "NO_ARTIFACT",
            ErrorCode::EncodeFailed => "ENCODE_FAILED",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::ModelInitFailed => "Required synthesis backend failed to initialize",
            ErrorCode::GenerationFailed => "Synthesis backend failed to produce audio",
            ErrorCode::NoArtifact => "No output artifact could be located or produced",
            ErrorCode::EncodeFailed => "Failed to encode audio tensor to the requested format",
            ErrorCode::Internal => "Internal worker error",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::ModelInitFailed => {
                "Check that a generation daemon is listening on ACESTEP_SOCKET or that the \
                 ACESTEP_CLI program is on PATH; initialization is retried on the next request"
            }
            ErrorCode::GenerationFailed => {
                "Retry the request; if it persists, reduce duration or inference_steps, \
                 or check backend logs for resource exhaustion"
            }
            ErrorCode::NoArtifact => {
                "Verify the backend writes its output into the provided scratch directory \
                 (output.<format> or output.wav)"
            }
            ErrorCode::EncodeFailed => {
                "Request wav output, or build the worker with the audio-mp3 feature for \
                 mp3; flac must be produced by the backend itself"
            }
            ErrorCode::Internal => {
                "Check free disk space and file permissions for the temp directory, \
                 then retry the request"
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for worker operations.
#[derive(Debug)]
pub struct WorkerError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl WorkerError {
    /// Creates a new WorkerError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new WorkerError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a MODEL_INIT_FAILED error.
    pub fn model_init_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelInitFailed,
            format!("Failed to initialize synthesis backend: {}", reason.into()),
        )
    }

    /// Creates a GENERATION_FAILED error.
    pub fn generation_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GenerationFailed,
            format!("Generation failed: {}", reason.into()),
        )
    }

    /// Creates a NO_ARTIFACT error.
    pub fn no_artifact(detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::NoArtifact,
            format!("No output artifact: {}", detail.into()),
        )
    }

    /// Creates an ENCODE_FAILED error.
    pub fn encode_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::EncodeFailed,
            format!("Audio encode failed: {}", reason.into()),
        )
    }

    /// Creates an INTERNAL error.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, reason)
    }
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using WorkerError.
pub type Result<T> = std::result::Result<T, WorkerError>;
