//! posefuse simulation
//!
//! Synthetic data and a batch runner for the estimators in `posefuse-core`.
//!
//! A run drives a robot around a circle, observes it with a noisy camera and
//! a less noisy LiDAR, derives the controls from a simulated IMU, and feeds
//! everything through the fusion loop:
//!
//! ```text
//! truth ──► camera ─┐
//!       ├─► lidar ──┼─► fuse ──► EKF / PF update
//!       └─► imu ────┴──────────► EKF / PF predict (v, ω)
//! ```
//!
//! # Components
//!
//! - [`trajectory`]: circle and dead-reckoned ground truth
//! - [`sensors`]: pose sensors and the IMU model
//! - [`noise`]: seeded Gaussian noise
//! - [`config`]: simulation configuration (JSON loadable)
//! - [`simulator`]: the batch runner and its report
//! - [`report`]: JSON report files
//! - [`cli`]: command-line arguments of the `posefuse` binary

pub mod cli;
pub mod config;
pub mod error;
pub mod noise;
pub mod report;
pub mod sensors;
pub mod simulator;
pub mod trajectory;

pub use config::{FusionStrategy, SensorConfig, SimConfig};
pub use error::{Result, SimError};
pub use simulator::{SimReport, Simulator};
pub use trajectory::{CircleTrajectory, GroundTruth};
