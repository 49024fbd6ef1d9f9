//! # posefuse core
//!
//! Planar pose estimation from noisy, asynchronous observations with two
//! competing recursive estimators: an Extended Kalman Filter and a
//! Sampling-Importance-Resampling particle filter.
//!
//! ## Modules
//!
//! - [`motion`]: Unicycle motion model and its Jacobian
//! - [`estimation`]: State estimators (EKF, particle filter) and the shared
//!   [`PoseEstimator`](estimation::PoseEstimator) interface
//! - [`fusion`]: Observation fusion strategies and the per-tick fusion loop
//! - [`config`]: Filter configuration with defaults
//! - [`metrics`]: Tracking error against ground truth
//! - [`error`]: Error taxonomy

pub mod config;
pub mod error;
pub mod estimation;
pub mod fusion;
pub mod metrics;
pub mod motion;

pub use config::{EkfConfig, FilterConfig, ParticleFilterConfig};
pub use error::{FusionError, Result};
pub use estimation::{ExtendedKalmanFilter, ParticleFilter, PoseEstimator};
pub use fusion::{FusionLoop, FusionOutput, ObservationStream, SensorFeed};
pub use motion::Control;

use nalgebra::{Matrix3, Vector3};

/// Planar pose `(x, y, θ)`, heading in radians and not normalized
pub type Pose = Vector3<f64>;

/// 3x3 matrix type (covariances, Jacobians)
pub type Mat3 = Matrix3<f64>;

