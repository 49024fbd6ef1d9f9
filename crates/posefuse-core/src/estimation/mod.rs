//! State estimation algorithms
//!
//! - EKF (Extended Kalman Filter): single Gaussian belief, motion model
//!   linearized every tick
//! - Particle filter: weighted empirical belief with multinomial resampling

pub mod ekf;
pub mod particle_filter;

pub use ekf::*;
pub use particle_filter::*;

use rand::RngCore;

use crate::error::Result;
use crate::{Control, Pose};

/// Recursive pose estimator driven by the fusion loop
///
/// The random source is always passed in by the caller so that a run is
/// reproducible from its seed. Deterministic estimators ignore it.
pub trait PoseEstimator {
    /// Propagate the belief through one tick of the motion model
    fn predict(&mut self, control: &Control, rng: &mut dyn RngCore);

    /// Correct the belief with a pose-space observation
    fn update(&mut self, observation: &Pose) -> Result<()>;

    /// Rebuild the sample set after an update. No-op for parametric filters.
    fn resample(&mut self, _rng: &mut dyn RngCore) {}

    /// Current best estimate
    fn estimate(&self) -> Pose;
}
