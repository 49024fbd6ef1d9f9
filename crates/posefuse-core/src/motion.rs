//! Unicycle motion model
//!
//! Shared by the EKF (state transition + linearization), every particle of
//! the particle filter, and dead-reckoned ground truth in the simulator.
//!
//! ```text
//! x' = x + v·cos(θ)·dt
//! y' = y + v·sin(θ)·dt
//! θ' = θ + ω·dt
//! ```
//!
//! θ is the heading *before* the step.

use serde::{Deserialize, Serialize};

use crate::{Mat3, Pose};

/// Control input for one tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Control {
    /// Linear velocity [m/s]
    pub v: f64,
    /// Angular velocity [rad/s]
    pub omega: f64,
}

impl Control {
    pub fn new(v: f64, omega: f64) -> Self {
        Self { v, omega }
    }

    pub fn is_finite(&self) -> bool {
        self.v.is_finite() && self.omega.is_finite()
    }
}

/// Apply one step of the motion model
pub fn propagate(pose: &Pose, u: &Control, dt: f64) -> Pose {
    let theta = pose.z;
    Pose::new(
        pose.x + u.v * theta.cos() * dt,
        pose.y + u.v * theta.sin() * dt,
        theta + u.omega * dt,
    )
}

/// Jacobian of [`propagate`] with respect to the state, at the pre-step heading
pub fn jacobian(pose: &Pose, u: &Control, dt: f64) -> Mat3 {
    let theta = pose.z;
    Mat3::new(
        1.0, 0.0, -u.v * theta.sin() * dt,
        0.0, 1.0, u.v * theta.cos() * dt,
        0.0, 0.0, 1.0,
    )
}
