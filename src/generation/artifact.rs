//! Artifact resolution.
//!
//! Turns whatever a backend produced into audio bytes. Backends differ in
//! what they hand back: a finished file, raw samples, or only a sibling
//! `.wav` dropped next to the requested output. The resolver tries each
//! strategy in order and errors only when all of them come up empty.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::audio;
use crate::error::{Result, WorkerError};
use crate::models::{AudioArtifact, AudioTensor};
use crate::types::AudioFormat;

/// Resolves an artifact to encoded audio bytes.
///
/// Strategies, in order:
/// 1. read the file at the artifact's reported path;
/// 2. encode the artifact's raw tensor to `format` under `scratch`;
/// 3. probe for a `.wav` sibling of the expected output path;
/// 4. give up with a no-artifact error.
pub fn resolve_artifact(
    artifact: &AudioArtifact,
    format: AudioFormat,
    scratch: &Path,
) -> Result<Vec<u8>> {
    let expected = expected_path(artifact, format, scratch);

    // Strategy 1: a file the backend already wrote
    if let Some(path) = &artifact.path {
        if path.is_file() {
            match std::fs::read(path) {
                Ok(bytes) => return Ok(bytes),
                Err(e) => warn!("failed to read artifact {}: {}", path.display(), e),
            }
        }
    }

    // Strategy 2: encode raw samples ourselves
    if let Some(tensor) = &artifact.tensor {
        match encode_tensor(tensor, format, &expected) {
            Ok(()) => {
                match std::fs::read(&expected) {
                    Ok(bytes) => return Ok(bytes),
                    Err(e) => warn!("failed to read encoded audio: {}", e),
                }
            }
            Err(e) => warn!("tensor encode failed: {}", e),
        }
    }

    // Strategy 3: backends that cannot encode the requested format leave
    // a wav next to the expected output
    let wav_sibling = expected.with_extension("wav");
    if wav_sibling != expected && wav_sibling.is_file() {
        debug!("falling back to wav sibling {}", wav_sibling.display());
        match std::fs::read(&wav_sibling) {
            Ok(bytes) => return Ok(bytes),
            Err(e) => warn!("failed to read wav sibling: {}", e),
        }
    }

    Err(WorkerError::no_artifact(format!(
        "no audio found at {} or its wav sibling",
        expected.display()
    )))
}

/// The path the output is expected at for this artifact.
fn expected_path(artifact: &AudioArtifact, format: AudioFormat, scratch: &Path) -> PathBuf {
    artifact
        .path
        .clone()
        .unwrap_or_else(|| scratch.join(format!("output.{}", format.extension())))
}

/// Encodes raw samples to `path` in the requested format.
fn encode_tensor(tensor: &AudioTensor, format: AudioFormat, path: &Path) -> Result<()> {
    let sample_rate = tensor.sample_rate.unwrap_or(audio::SAMPLE_RATE);
    debug!(
        "encoding {:.2}s of audio to {}",
        audio::samples_to_duration(tensor.samples.len(), tensor.channels, sample_rate),
        path.display()
    );

    match format {
        AudioFormat::Wav => audio::write_wav(&tensor.samples, path, sample_rate, tensor.channels),
        #[cfg(feature = "audio-mp3")]
        AudioFormat::Mp3 => {
            if tensor.channels == 1 {
                let stereo: Vec<f32> = tensor.samples.iter().flat_map(|s| [*s, *s]).collect();
                audio::write_mp3(path, &stereo, sample_rate, 2)
            } else {
                audio::write_mp3(path, &tensor.samples, sample_rate, tensor.channels)
            }
        }
        #[cfg(not(feature = "audio-mp3"))]
        AudioFormat::Mp3 => Err(WorkerError::encode_failed(
            "mp3 encoding requires the audio-mp3 feature",
        )),
        AudioFormat::Flac => Err(WorkerError::encode_failed(
            "no built-in flac encoder, expecting a backend-written file",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tensor_artifact() -> AudioArtifact {
        AudioArtifact::from_tensor(AudioTensor {
            samples: vec![0.0f32; 1024],
            channels: 1,
            sample_rate: None,
        })
    }

    #[test]
    fn backend_written_file_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output.mp3");
        std::fs::write(&path, b"backend bytes").unwrap();

        let mut artifact = tensor_artifact();
        artifact.path = Some(path);

        let bytes = resolve_artifact(&artifact, AudioFormat::Mp3, dir.path()).unwrap();
        assert_eq!(bytes, b"backend bytes");
    }

    #[test]
    fn tensor_encodes_wav_at_expected_location() {
        let dir = tempdir().unwrap();
        let bytes = resolve_artifact(&tensor_artifact(), AudioFormat::Wav, dir.path()).unwrap();

        assert!(!bytes.is_empty());
        let encoded = dir.path().join("output.wav");
        assert!(encoded.is_file());

        let reader = hound::WavReader::open(&encoded).unwrap();
        assert_eq!(reader.spec().sample_rate, audio::SAMPLE_RATE);
    }

    #[cfg(feature = "audio-mp3")]
    #[test]
    fn tensor_encodes_mp3_upmixing_mono() {
        let dir = tempdir().unwrap();
        let bytes = resolve_artifact(&tensor_artifact(), AudioFormat::Mp3, dir.path()).unwrap();

        assert!(!bytes.is_empty());
        assert!(bytes[0] == 0xFF || bytes[0] == 0x49);
        assert!(dir.path().join("output.mp3").is_file());
    }

    #[test]
    fn flac_tensor_falls_through_to_wav_sibling() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("output.wav"), b"RIFF-probe").unwrap();

        let bytes = resolve_artifact(&tensor_artifact(), AudioFormat::Flac, dir.path()).unwrap();
        assert_eq!(bytes, b"RIFF-probe");
    }

    #[test]
    fn missing_path_falls_through_to_wav_sibling() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("output.wav"), b"RIFF-probe").unwrap();

        let artifact = AudioArtifact::from_path(dir.path().join("output.mp3"));
        let bytes = resolve_artifact(&artifact, AudioFormat::Mp3, dir.path()).unwrap();
        assert_eq!(bytes, b"RIFF-probe");
    }

    #[test]
    fn exhausted_strategies_report_no_artifact() {
        let dir = tempdir().unwrap();
        let artifact = AudioArtifact::default();

        let err = resolve_artifact(&artifact, AudioFormat::Mp3, dir.path()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NoArtifact);
        assert!(err.message.contains("output.mp3"));
    }
}
