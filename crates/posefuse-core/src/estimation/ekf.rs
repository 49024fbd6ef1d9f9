//! Extended Kalman Filter (EKF) implementation
//!
//! Single Gaussian belief over the pose `(x, y, θ)`.
//!
//! The observation model is the identity: every observation is a noisy pose
//! directly comparable to the state, so there is no `H` matrix and the
//! update reduces to
//!
//! ```text
//! y = z - x          S = P + R          K = P·S⁻¹
//! x ← x + K·y        P ← (I - K)·P
//! ```

use nalgebra::{Cholesky, Vector3};
use rand::RngCore;
use tracing::debug;

use super::PoseEstimator;
use crate::config::EkfConfig;
use crate::error::{FusionError, Result};
use crate::motion::{self, Control};
use crate::{Mat3, Pose};

/// Reciprocal condition bound below which S is treated as singular
const MIN_RCOND: f64 = 1e-12;

/// Relative size below which S is round-off around a point mass
const NEGLIGIBLE_INNOVATION: f64 = 1e-12;

/// EKF state container
#[derive(Debug, Clone, PartialEq)]
pub struct EkfState {
    /// State estimate
    pub x: Pose,
    /// Covariance matrix
    pub p: Mat3,
}

impl EkfState {
    pub fn new(x: Pose, p: Mat3) -> Self {
        Self { x, p }
    }
}

/// Extended Kalman Filter over a planar pose
#[derive(Debug, Clone)]
pub struct ExtendedKalmanFilter {
    /// Current state estimate and covariance
    pub state: EkfState,
    /// Process noise covariance (Q)
    pub q: Mat3,
    /// Measurement noise covariance (R)
    pub r: Mat3,
    dt: f64,
    /// `max(1, trace(P₀))`, the scale S is compared against
    prior_scale: f64,
    ticks: u64,
    last_innovation: Option<Pose>,
}

impl ExtendedKalmanFilter {
    /// Create an EKF from its configuration
    pub fn new(config: &EkfConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: EkfState::new(
                config.initial_state,
                Mat3::identity() * config.initial_covariance_scale,
            ),
            q: Mat3::from_diagonal(&config.process_noise),
            r: Mat3::from_diagonal(&config.measurement_noise),
            dt: config.dt,
            prior_scale: (3.0 * config.initial_covariance_scale).max(1.0),
            ticks: 0,
            last_innovation: None,
        })
    }

    /// Set measurement noise covariance diagonal
    pub fn set_measurement_noise(&mut self, r_diag: &Vector3<f64>) {
        self.r = Mat3::from_diagonal(r_diag);
    }

    /// Prediction step
    ///
    /// Moves the mean through the exact nonlinear motion model and the
    /// covariance through its Jacobian at the pre-update heading:
    /// `P ← F·P·Fᵗ + Q`.
    pub fn predict(&mut self, u: &Control) {
        let f_mat = motion::jacobian(&self.state.x, u, self.dt);
        self.state.x = motion::propagate(&self.state.x, u, self.dt);
        self.state.p = symmetrize(&(f_mat * self.state.p * f_mat.transpose() + self.q));
        self.ticks += 1;
    }

    /// Update step with a pose observation
    ///
    /// Fails with [`FusionError::Numerical`] when the innovation covariance
    /// cannot be inverted. An innovation covariance that is zero up to
    /// round-off means both the prior and the observation are point masses;
    /// the gain's limit is zero there and the correction is skipped.
    pub fn update(&mut self, z: &Pose) -> Result<()> {
        // Innovation
        let y = z - self.state.x;
        self.last_innovation = Some(y);

        // Innovation covariance: S = P + R
        let s = self.state.p + self.r;

        if s.amax() <= NEGLIGIBLE_INNOVATION * self.prior_scale {
            debug!(
                norm = s.norm(),
                "EKF: negligible innovation covariance, skipping correction"
            );
            return Ok(());
        }

        let s_inv = invert_innovation(&s)?;

        // Kalman gain: K = P * S^(-1)
        let k = self.state.p * s_inv;

        self.state.x += k * y;
        self.state.p = symmetrize(&((Mat3::identity() - k) * self.state.p));

        debug!(
            innovation = y.norm(),
            trace = self.state.p.trace(),
            "EKF update"
        );
        Ok(())
    }

    pub fn state(&self) -> &EkfState {
        &self.state
    }

    /// Get current covariance
    pub fn covariance(&self) -> &Mat3 {
        &self.state.p
    }

    /// Residual `z - x` of the most recent update
    pub fn innovation(&self) -> Option<&Pose> {
        self.last_innovation.as_ref()
    }

    /// Tick length [s]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of predict steps taken
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }
}

impl PoseEstimator for ExtendedKalmanFilter {
    fn predict(&mut self, control: &Control, _rng: &mut dyn RngCore) {
        ExtendedKalmanFilter::predict(self, control);
    }

    fn update(&mut self, observation: &Pose) -> Result<()> {
        ExtendedKalmanFilter::update(self, observation)
    }

    fn estimate(&self) -> Pose {
        self.state.x
    }
}

fn invert_innovation(s: &Mat3) -> Result<Mat3> {
    let chol = Cholesky::new(*s).ok_or_else(|| FusionError::Numerical {
        reason: "innovation covariance is not positive definite".into(),
    })?;

    let diag = chol.l().diagonal();
    let (min, max) = (diag.min(), diag.max());
    if !(max > 0.0) || (min / max).powi(2) < MIN_RCOND {
        return Err(FusionError::Numerical {
            reason: format!(
                "innovation covariance is ill-conditioned (rcond ~ {:e})",
                (min / max).powi(2)
            ),
        });
    }

    let inv = chol.inverse();
    if inv.iter().all(|v| v.is_finite()) {
        Ok(inv)
    } else {
        Err(FusionError::Numerical {
            reason: "innovation covariance inverse is not finite".into(),
        })
    }
}

fn symmetrize(m: &Mat3) -> Mat3 {
    (m + m.transpose()) * 0.5
}
