//! Error types for batch terrain operations

use thiserror::Error;

use crate::terrain::TerrainError;

/// Main error type for the crate
///
/// Per-unit failures never surface through this type; they are recorded
/// against their unit in the run report. These are run-level errors only.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Run failed before processing any unit: {0}")]
    RunFailure(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Terrain error: {0}")]
    Terrain(#[from] TerrainError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid run state transition: {from} -> {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}

impl Error {
    /// Shorthand for a precondition violation
    pub fn precondition(msg: impl Into<String>) -> Self {
        Error::Precondition(msg.into())
    }
}
