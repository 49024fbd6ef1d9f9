//! Simulation errors

use posefuse_core::FusionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Estimation failed: {0}")]
    Fusion(#[from] FusionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid simulation config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
