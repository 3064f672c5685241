//! Worker configuration module.
//!
//! Contains the runtime configuration for the worker, including backend
//! selection, device/attention pass-through options, and path configuration.
//! Everything here is collaborator configuration handed to the external
//! synthesis backend unmodified; the worker itself interprets none of it
//! beyond choosing which adapter to probe first.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Execution device requested from the synthesis backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Let the backend detect and use the best available device.
    #[default]
    Auto,

    /// Force CPU execution.
    Cpu,

    /// NVIDIA GPU acceleration.
    Cuda,

    /// Apple Silicon acceleration.
    Metal,
}

impl Device {
    /// Returns the string representation of the device.
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Auto => "auto",
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
            Device::Metal => "metal",
        }
    }

    /// Parses a device from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Device::Auto),
            "cpu" => Some(Device::Cpu),
            "cuda" => Some(Device::Cuda),
            "metal" | "coreml" => Some(Device::Metal),
            _ => None,
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Attention implementation the synthesis backend should use.
///
/// Some environments ship an accelerated attention kernel that is not
/// always compatible with the installed runtime. The portable variant is
/// the safe default; the choice is forwarded to the backend as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttentionBackend {
    /// Portable attention implementation, works everywhere.
    #[default]
    Portable,

    /// Optimized attention kernel, requires compatible hardware/runtime.
    Accelerated,
}

impl AttentionBackend {
    /// Returns the string representation of the attention backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttentionBackend::Portable => "portable",
            AttentionBackend::Accelerated => "accelerated",
        }
    }

    /// Parses an attention backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "portable" | "sdpa" => Some(AttentionBackend::Portable),
            "accelerated" | "flash" => Some(AttentionBackend::Accelerated),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttentionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which synthesis adapter the session should initialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendSelect {
    /// Probe adapters in priority order: daemon first, then CLI.
    #[default]
    Auto,

    /// Only the resident generation daemon (Unix socket).
    Daemon,

    /// Only the generation CLI subprocess.
    Cli,
}

impl BackendSelect {
    /// Returns the string representation of the backend selection.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendSelect::Auto => "auto",
            BackendSelect::Daemon => "daemon",
            BackendSelect::Cli => "cli",
        }
    }

    /// Parses a backend selection from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(BackendSelect::Auto),
            "daemon" | "socket" => Some(BackendSelect::Daemon),
            "cli" | "subprocess" => Some(BackendSelect::Cli),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendSelect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runtime configuration for the worker.
///
/// Typically loaded from environment variables at startup and shared
/// read-only across all requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Backend configuration identifier forwarded to initialization.
    pub config_id: String,

    /// Path to the checkpoint/model directory.
    /// If None, uses the platform-specific default cache location.
    pub checkpoint_path: Option<PathBuf>,

    /// Execution device requested from the backend.
    pub device: Device,

    /// Attention implementation requested from the backend.
    pub attention: AttentionBackend,

    /// Which synthesis adapter to initialize.
    pub backend: BackendSelect,

    /// Unix socket path of the resident generation daemon.
    pub socket_path: PathBuf,

    /// Program name or path of the generation CLI.
    pub cli_program: String,

    /// Model identifier echoed in success payloads.
    pub model_id: String,
}

impl WorkerConfig {
    /// Creates a new WorkerConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a WorkerConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `ACESTEP_CONFIG` - Backend configuration identifier
    /// - `ACESTEP_CHECKPOINT` - Checkpoint/model directory
    /// - `ACESTEP_DEVICE` - Device selection (auto, cpu, cuda, metal)
    /// - `ACESTEP_ATTENTION` - Attention implementation (portable, accelerated)
    /// - `ACESTEP_BACKEND` - Adapter selection (auto, daemon, cli)
    /// - `ACESTEP_SOCKET` - Generation daemon socket path
    /// - `ACESTEP_CLI` - Generation CLI program
    /// - `ACESTEP_MODEL_ID` - Model identifier for payloads
    ///
    /// Falls back to defaults for unset or unparseable variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(id) = std::env::var("ACESTEP_CONFIG") {
            if !id.trim().is_empty() {
                config.config_id = id;
            }
        }

        if let Ok(path) = std::env::var("ACESTEP_CHECKPOINT") {
            if !path.trim().is_empty() {
                config.checkpoint_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(device_str) = std::env::var("ACESTEP_DEVICE") {
            if let Some(device) = Device::parse(&device_str) {
                config.device = device;
            }
        }

        if let Ok(attention_str) = std::env::var("ACESTEP_ATTENTION") {
            if let Some(attention) = AttentionBackend::parse(&attention_str) {
                config.attention = attention;
            }
        }

        if let Ok(backend_str) = std::env::var("ACESTEP_BACKEND") {
            if let Some(backend) = BackendSelect::parse(&backend_str) {
                config.backend = backend;
            }
        }

        if let Ok(path) = std::env::var("ACESTEP_SOCKET") {
            if !path.trim().is_empty() {
                config.socket_path = PathBuf::from(path);
            }
        }

        if let Ok(program) = std::env::var("ACESTEP_CLI") {
            if !program.trim().is_empty() {
                config.cli_program = program;
            }
        }

        if let Ok(id) = std::env::var("ACESTEP_MODEL_ID") {
            if !id.trim().is_empty() {
                config.model_id = id;
            }
        }

        config
    }

    /// Returns the effective checkpoint path, using platform defaults if not specified.
    pub fn effective_checkpoint_path(&self) -> PathBuf {
        if let Some(ref path) = self.checkpoint_path {
            path.clone()
        } else {
            default_checkpoint_path()
        }
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.model_id.trim().is_empty() {
            return Some("model_id must not be empty".to_string());
        }

        if self.cli_program.trim().is_empty() && self.backend != BackendSelect::Daemon {
            return Some("cli_program must not be empty when the CLI adapter may be used".to_string());
        }

        if self.socket_path.as_os_str().is_empty() && self.backend != BackendSelect::Cli {
            return Some("socket_path must not be empty when the daemon adapter may be used".to_string());
        }

        None
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            config_id: "acestep-v15-turbo".to_string(),
            checkpoint_path: None,
            device: Device::Auto,
            attention: AttentionBackend::Portable,
            backend: BackendSelect::Auto,
            socket_path: PathBuf::from("/tmp/acestep-gen.sock"),
            cli_program: "acestep".to_string(),
            model_id: "ace-step-1.5".to_string(),
        }
    }
}

/// Returns the platform-specific default checkpoint storage path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Caches/acestep-worker/checkpoints
/// - Linux: ~/.cache/acestep-worker/checkpoints
/// - Windows: C:\Users\<user>\AppData\Local\acestep-worker\cache\checkpoints
fn default_checkpoint_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "acestep-worker") {
        proj_dirs.cache_dir().join("checkpoints")
    } else {
        // Fallback to current directory
        PathBuf::from("./checkpoints")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_parsing() {
        assert_eq!(Device::parse("auto"), Some(Device::Auto));
        assert_eq!(Device::parse("CPU"), Some(Device::Cpu));
        assert_eq!(Device::parse("cuda"), Some(Device::Cuda));
        assert_eq!(Device::parse("metal"), Some(Device::Metal));
        assert_eq!(Device::parse("coreml"), Some(Device::Metal));
        assert_eq!(Device::parse("invalid"), None);
    }

    #[test]
    fn attention_parsing() {
        assert_eq!(AttentionBackend::parse("portable"), Some(AttentionBackend::Portable));
        assert_eq!(AttentionBackend::parse("sdpa"), Some(AttentionBackend::Portable));
        assert_eq!(AttentionBackend::parse("Accelerated"), Some(AttentionBackend::Accelerated));
        assert_eq!(AttentionBackend::parse("flash"), Some(AttentionBackend::Accelerated));
        assert_eq!(AttentionBackend::parse("bogus"), None);
    }

    #[test]
    fn backend_select_parsing() {
        assert_eq!(BackendSelect::parse("auto"), Some(BackendSelect::Auto));
        assert_eq!(BackendSelect::parse("daemon"), Some(BackendSelect::Daemon));
        assert_eq!(BackendSelect::parse("socket"), Some(BackendSelect::Daemon));
        assert_eq!(BackendSelect::parse("CLI"), Some(BackendSelect::Cli));
        assert_eq!(BackendSelect::parse("subprocess"), Some(BackendSelect::Cli));
        assert_eq!(BackendSelect::parse("none"), None);
    }

    #[test]
    fn enum_display() {
        assert_eq!(Device::Auto.to_string(), "auto");
        assert_eq!(AttentionBackend::Portable.to_string(), "portable");
        assert_eq!(BackendSelect::Cli.to_string(), "cli");
    }

    #[test]
    fn config_defaults() {
        let config = WorkerConfig::new();
        assert_eq!(config.config_id, "acestep-v15-turbo");
        assert_eq!(config.device, Device::Auto);
        assert_eq!(config.attention, AttentionBackend::Portable);
        assert_eq!(config.backend, BackendSelect::Auto);
        assert_eq!(config.cli_program, "acestep");
        assert_eq!(config.model_id, "ace-step-1.5");
        assert!(config.checkpoint_path.is_none());
    }

    #[test]
    fn config_validation() {
        let mut config = WorkerConfig::new();
        assert!(config.validate().is_none());

        config.model_id = String::new();
        assert!(config.validate().is_some());

        config.model_id = "ace-step-1.5".to_string();
        config.cli_program = String::new();
        assert!(config.validate().is_some());

        // CLI never probed, empty program is fine
        config.backend = BackendSelect::Daemon;
        assert!(config.validate().is_none());
    }

    #[test]
    fn effective_checkpoint_path_nonempty() {
        let config = WorkerConfig::new();
        assert!(!config.effective_checkpoint_path().as_os_str().is_empty());

        let explicit = WorkerConfig {
            checkpoint_path: Some(PathBuf::from("/models/ace")),
            ..WorkerConfig::default()
        };
        assert_eq!(explicit.effective_checkpoint_path(), PathBuf::from("/models/ace"));
    }
}
