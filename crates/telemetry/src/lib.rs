//! Logging bootstrap
//!
//! Installs a `tracing` subscriber filtered by `RUST_LOG`. Configuration is
//! read before anything else at start-up, so this is usually the first call
//! an application makes.

mod tracing;

pub use crate::tracing::*;

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Failed to initialize tracing: {0}")]
    InitError(String),

    #[error("Invalid filter directive: {0}")]
    FilterError(String),
}
