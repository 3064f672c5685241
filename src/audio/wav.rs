//! WAV file writer for audio output.
//!
//! Writes audio samples to WAV format using the hound crate.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::{Result, WorkerError};

/// Sample rate assumed when a backend reports none (44.1kHz).
pub const SAMPLE_RATE: u32 = 44_100;

/// Number of audio channels written to disk (stereo).
pub const CHANNELS: u16 = 2;

/// Writes audio samples to a WAV file.
///
/// `samples` is interleaved at `channels`; mono input is duplicated to
/// both output channels so the file always comes out stereo.
///
/// # Example
///
/// ```ignore
/// use acestep_worker::audio::write_wav;
///
/// let samples = vec![0.0, 0.5, -0.5, 0.0];
/// write_wav(&samples, "/tmp/test.wav".as_ref(), 44_100, 1)?;
/// ```
pub fn write_wav(samples: &[f32], path: &Path, sample_rate: u32, channels: u16) -> Result<()> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)
        .map_err(|e| WorkerError::encode_failed(format!("failed to create wav file: {}", e)))?;

    write_frames(&mut writer, samples, channels)?;

    writer
        .finalize()
        .map_err(|e| WorkerError::encode_failed(format!("failed to finalize wav file: {}", e)))?;

    Ok(())
}

/// Writes audio samples to an in-memory WAV buffer.
///
/// Returns the WAV file contents as a byte vector.
pub fn write_wav_to_buffer(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut buffer = Vec::new();
    let cursor = std::io::Cursor::new(&mut buffer);

    {
        let mut writer = WavWriter::new(cursor, spec)
            .map_err(|e| WorkerError::encode_failed(format!("failed to create wav writer: {}", e)))?;
        write_frames(&mut writer, samples, channels)?;
        writer.finalize().map_err(|e| {
            WorkerError::encode_failed(format!("failed to finalize wav buffer: {}", e))
        })?;
    }

    Ok(buffer)
}

fn write_frames<W: std::io::Write + std::io::Seek>(
    writer: &mut WavWriter<W>,
    samples: &[f32],
    channels: u16,
) -> Result<()> {
    match channels {
        1 => {
            for sample in samples {
                // Write same sample to both left and right channels
                writer.write_sample(*sample).map_err(write_err)?;
                writer.write_sample(*sample).map_err(write_err)?;
            }
        }
        2 => {
            for sample in samples {
                writer.write_sample(*sample).map_err(write_err)?;
            }
        }
        other => {
            return Err(WorkerError::encode_failed(format!(
                "unsupported channel count {}",
                other
            )))
        }
    }
    Ok(())
}

fn write_err(e: hound::Error) -> WorkerError {
    WorkerError::encode_failed(format!("failed to write sample: {}", e))
}

/// Calculates the duration of interleaved audio in seconds.
pub fn samples_to_duration(sample_count: usize, channels: u16, sample_rate: u32) -> f32 {
    if channels == 0 || sample_rate == 0 {
        return 0.0;
    }
    (sample_count / channels as usize) as f32 / sample_rate as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_wav_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wav");

        let samples = vec![0.0f32, 0.5, -0.5, 0.0];
        write_wav(&samples, &path, SAMPLE_RATE, 1).unwrap();

        assert!(path.exists());

        // Verify file is valid WAV
        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, CHANNELS);
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.sample_format, SampleFormat::Float);
    }

    #[test]
    fn mono_input_is_duplicated_to_stereo() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mono.wav");

        write_wav(&[0.25f32, -0.25], &path, SAMPLE_RATE, 1).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.25, 0.25, -0.25, -0.25]);
    }

    #[test]
    fn stereo_input_passes_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        write_wav(&[0.1f32, 0.2, 0.3, 0.4], &path, SAMPLE_RATE, 2).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn write_wav_to_buffer_returns_valid_wav() {
        let samples = vec![0.0f32, 0.5, -0.5, 0.0];
        let buffer = write_wav_to_buffer(&samples, SAMPLE_RATE, 1).unwrap();

        assert!(!buffer.is_empty());
        // WAV files start with "RIFF"
        assert_eq!(&buffer[0..4], b"RIFF");
    }

    #[test]
    fn unsupported_channel_count_is_rejected() {
        let err = write_wav_to_buffer(&[0.0f32; 6], SAMPLE_RATE, 3).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::EncodeFailed);
    }

    #[test]
    fn samples_to_duration_calculation() {
        assert_eq!(samples_to_duration(44_100, 1, 44_100), 1.0);
        assert_eq!(samples_to_duration(88_200, 2, 44_100), 1.0);
        assert_eq!(samples_to_duration(22_050, 1, 44_100), 0.5);
        assert_eq!(samples_to_duration(100, 0, 44_100), 0.0);
    }
}
