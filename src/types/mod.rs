//! Core types for the worker.
//!
//! This module re-exports the request-side data types:
//! - [`GenerationRequest`]: A fully normalized music-generation request
//! - [`AudioFormat`]: The whitelisted output container formats

mod request;

// Re-export all types at the module level
pub use request::{
    AudioFormat, GenerationRequest, DEFAULT_CAPTION, DEFAULT_DURATION_SECS,
    DEFAULT_INFERENCE_STEPS, DEFAULT_VOCAL_LANGUAGE, INSTRUMENTAL_LYRICS, RANDOM_SEED,
};
