//! MP3 encoding via libmp3lame.
//!
//! Requires the `audio-mp3` feature and `libmp3lame` to be installed on the
//! system.

use std::io::Write;
use std::path::Path;

use mp3lame_encoder::{Builder, FlushNoGap, InterleavedPcm, Quality};

use crate::error::{Result, WorkerError};

/// Writes interleaved f32 samples to a file as MP3 at 192 kbps.
///
/// `samples` must be interleaved stereo: `[L, R, L, R, ...]`.
pub fn write_mp3(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| WorkerError::encode_failed(format!("failed to create mp3 file: {}", e)))?;
    write_mp3_to(file, samples, sample_rate, channels)
}

/// Writes interleaved f32 samples to a writer as MP3 at 192 kbps.
pub fn write_mp3_to<W: Write>(
    mut writer: W,
    samples: &[f32],
    sample_rate: u32,
    channels: u16,
) -> Result<()> {
    if channels != 2 {
        return Err(WorkerError::encode_failed(format!(
            "mp3 encoder only supports stereo (2 channels), got {}",
            channels
        )));
    }

    let mut encoder = Builder::new()
        .ok_or_else(|| WorkerError::encode_failed("failed to create LAME encoder"))?
        .with_num_channels(channels as u8)
        .map_err(|e| WorkerError::encode_failed(format!("LAME set_num_channels failed: {:?}", e)))?
        .with_sample_rate(sample_rate)
        .map_err(|e| WorkerError::encode_failed(format!("LAME set_sample_rate failed: {:?}", e)))?
        .with_brate(mp3lame_encoder::Bitrate::Kbps192)
        .map_err(|e| WorkerError::encode_failed(format!("LAME set_brate failed: {:?}", e)))?
        .with_quality(Quality::Best)
        .map_err(|e| WorkerError::encode_failed(format!("LAME set_quality failed: {:?}", e)))?
        .build()
        .map_err(|e| WorkerError::encode_failed(format!("LAME build failed: {:?}", e)))?;

    let samples_per_channel = samples.len() / channels as usize;
    let mut buf = Vec::new();
    buf.reserve(mp3lame_encoder::max_required_buffer_size(
        samples_per_channel,
    ));

    let encoded_size = encoder
        .encode(InterleavedPcm(samples), buf.spare_capacity_mut())
        .map_err(|e| WorkerError::encode_failed(format!("LAME encode failed: {:?}", e)))?;
    // SAFETY: encode filled exactly `encoded_size` bytes into spare capacity.
    unsafe { buf.set_len(encoded_size) };

    let flush_size = encoder
        .flush::<FlushNoGap>(buf.spare_capacity_mut())
        .map_err(|e| WorkerError::encode_failed(format!("LAME flush failed: {:?}", e)))?;
    // SAFETY: flush filled exactly `flush_size` bytes into spare capacity.
    unsafe { buf.set_len(buf.len() + flush_size) };

    writer
        .write_all(&buf)
        .map_err(|e| WorkerError::encode_failed(format!("failed to write mp3 data: {}", e)))?;

    Ok(())
}
