//! Error taxonomy for the estimators and the fusion loop
//!
//! Every variant is fatal for the run that produced it: the pipeline is an
//! offline batch process and nothing here is retried.

use thiserror::Error;

/// Core errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    /// Innovation covariance could not be inverted during an EKF update
    #[error("Numerical error: {reason}")]
    Numerical { reason: String },

    /// Feed arrays disagree in length or dimensionality
    #[error("Shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    /// A control input is NaN or infinite
    #[error("Non-finite control at tick {tick}")]
    NonFiniteControl { tick: usize },

    /// Particle weights could not be normalized
    #[error("Degenerate particle weights (sum = {sum})")]
    DegenerateWeights { sum: f64 },

    /// Configuration rejected before construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FusionError {
    pub(crate) fn shape(context: impl Into<String>, expected: usize, found: usize) -> Self {
        FusionError::ShapeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }
}

/// Result alias used across the core crate
pub type Result<T> = std::result::Result<T, FusionError>;
