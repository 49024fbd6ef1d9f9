//! Sensor models for simulation
//!
//! Provides noisy measurements generated from a ground-truth trajectory.

use nalgebra::{Vector2, Vector3};
use posefuse_core::Pose;
use serde::{Deserialize, Serialize};

use crate::noise::NoiseGenerator;

/// Absolute pose sensor (camera, LiDAR) with independent Gaussian noise per
/// dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSensor {
    pub name: String,
    /// Noise std dev (σx [m], σy [m], σθ [rad])
    pub noise_std: Vector3<f64>,
}

impl PoseSensor {
    pub fn new(name: impl Into<String>, noise_std: Vector3<f64>) -> Self {
        Self {
            name: name.into(),
            noise_std,
        }
    }

    /// Camera: the noisier of the two
    pub fn camera() -> Self {
        Self::new("camera", Vector3::new(0.3, 0.3, 0.1))
    }

    pub fn lidar() -> Self {
        Self::new("lidar", Vector3::new(0.1, 0.1, 0.03))
    }

    /// Noisy observation of every pose in `truth`
    pub fn observe(&self, truth: &[Pose], noise: &mut NoiseGenerator) -> Vec<Pose> {
        truth
            .iter()
            .map(|pose| pose + noise.gaussian_vec3(&self.noise_std))
            .collect()
    }
}

/// IMU measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuMeasurement {
    /// Planar acceleration (world frame) [m/s²]
    pub acceleration: Vector2<f64>,
    /// Yaw rate [rad/s]
    pub angular_velocity: f64,
}

/// IMU (Inertial Measurement Unit) sensor model
///
/// Rates come from finite differences of the true trajectory: yaw rate from
/// first differences of heading, acceleration from second differences of
/// position. The series is padded with its last value to keep one
/// measurement per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImuSensor {
    /// Sample period [s]
    pub dt: f64,
    /// Accelerometer noise std dev [m/s²]
    pub accel_noise: f64,
    /// Gyroscope noise std dev [rad/s]
    pub gyro_noise: f64,
}

impl ImuSensor {
    pub fn new(dt: f64, accel_noise: f64, gyro_noise: f64) -> Self {
        Self {
            dt,
            accel_noise,
            gyro_noise,
        }
    }

    /// One measurement per pose in `truth`
    pub fn generate(&self, truth: &[Pose], noise: &mut NoiseGenerator) -> Vec<ImuMeasurement> {
        let n = truth.len();

        let mut omega: Vec<f64> = truth
            .windows(2)
            .map(|w| (w[1].z - w[0].z) / self.dt)
            .collect();
        pad(&mut omega, n, 0.0);

        let velocity: Vec<Vector2<f64>> = truth
            .windows(2)
            .map(|w| Vector2::new(w[1].x - w[0].x, w[1].y - w[0].y) / self.dt)
            .collect();
        let mut acceleration: Vec<Vector2<f64>> = velocity
            .windows(2)
            .map(|w| (w[1] - w[0]) / self.dt)
            .collect();
        pad(&mut acceleration, n, Vector2::zeros());

        acceleration
            .into_iter()
            .zip(omega)
            .map(|(a, w)| ImuMeasurement {
                acceleration: a + Vector2::new(
                    noise.gaussian(self.accel_noise),
                    noise.gaussian(self.accel_noise),
                ),
                angular_velocity: w + noise.gaussian(self.gyro_noise),
            })
            .collect()
    }
}

/// Repeat the last value (or `fill` if there is none) up to `len`
fn pad<T: Copy>(values: &mut Vec<T>, len: usize, fill: T) {
    let last = values.last().copied().unwrap_or(fill);
    values.resize(len, last);
}
