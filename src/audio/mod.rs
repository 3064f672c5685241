//! Audio output module.
//!
//! Provides WAV file writing for generated audio, plus MP3 encoding when
//! the `audio-mp3` feature is enabled.

#[cfg(feature = "audio-mp3")]
pub mod mp3;
pub mod wav;

// Re-export commonly used items
#[cfg(feature = "audio-mp3")]
pub use mp3::write_mp3;
pub use wav::{samples_to_duration, write_wav, write_wav_to_buffer, CHANNELS, SAMPLE_RATE};
