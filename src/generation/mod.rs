//! Audio generation module.
//!
//! Provides the per-request pipeline and artifact resolution.

pub mod artifact;
pub mod pipeline;

// Re-export commonly used items
pub use artifact::resolve_artifact;
pub use pipeline::generate;
