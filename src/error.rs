// src/error.rs
use thiserror::Error;

/// Errors that end a run before any numbers are produced.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("input not ready: {0}")]
    NotReady(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
