//! Serverless worker surface.
//!
//! Ties the normalizer, session, and generation pipeline together behind
//! the job loop: [`run_worker`](server::run_worker) reads jobs from stdin,
//! [`handle`](handler::handle) turns each one into exactly one response.

pub mod handler;
pub mod server;
pub mod types;

// Re-export commonly used items
pub use handler::handle;
pub use server::run_worker;
pub use types::{job_params, ResponsePayload, SuccessPayload};
