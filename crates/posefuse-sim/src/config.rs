//! Simulation configuration
//!
//! Every field has a default, so a JSON config file only needs the values it
//! overrides.

use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use posefuse_core::fusion::{EqualWeightFusion, InverseVarianceFusion, ObservationFusion};
use posefuse_core::FilterConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::sensors::{ImuSensor, PoseSensor};
use crate::trajectory::CircleTrajectory;

/// Top-level simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Tick length [s], shared by the trajectory, the IMU and both filters
    pub dt: f64,
    /// Simulated time [s]
    pub duration: f64,
    /// Seed for sensor noise and particle filter sampling
    pub seed: u64,
    pub trajectory: CircleTrajectory,
    pub sensors: SensorConfig,
    pub fusion: FusionStrategy,
    /// Filter parameters; their `dt` is replaced by [`SimConfig::dt`]
    pub filters: FilterConfig,
    /// Leading ticks excluded from the error metrics
    pub transient_ticks: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            duration: 31.5,
            seed: 42,
            trajectory: CircleTrajectory::default(),
            sensors: SensorConfig::default(),
            fusion: FusionStrategy::default(),
            filters: FilterConfig::default(),
            transient_ticks: 50,
        }
    }
}

impl SimConfig {
    /// Load a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Filter parameters with the simulation tick length applied
    pub fn filter_config(&self) -> FilterConfig {
        self.filters.clone().with_dt(self.dt)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "dt must be finite and positive, got {}",
                self.dt
            )));
        }
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "duration must be finite and non-negative, got {}",
                self.duration
            )));
        }
        self.trajectory.validate()?;
        self.sensors.validate()?;
        self.filter_config().validate()?;
        Ok(())
    }
}

/// Sensor noise levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Camera noise std dev (σx, σy, σθ)
    pub camera: Vector3<f64>,
    /// LiDAR noise std dev (σx, σy, σθ)
    pub lidar: Vector3<f64>,
    /// Accelerometer noise std dev [m/s²]
    pub accel_noise: f64,
    /// Gyroscope noise std dev [rad/s]
    pub gyro_noise: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            camera: PoseSensor::camera().noise_std,
            lidar: PoseSensor::lidar().noise_std,
            accel_noise: 0.05,
            gyro_noise: 0.01,
        }
    }
}

impl SensorConfig {
    /// Camera then LiDAR, in observation stream order
    pub fn pose_sensors(&self) -> Vec<PoseSensor> {
        vec![
            PoseSensor::new("camera", self.camera),
            PoseSensor::new("lidar", self.lidar),
        ]
    }

    pub fn imu(&self, dt: f64) -> ImuSensor {
        ImuSensor::new(dt, self.accel_noise, self.gyro_noise)
    }

    /// Noise-free sensors
    pub fn perfect() -> Self {
        Self {
            camera: Vector3::zeros(),
            lidar: Vector3::zeros(),
            accel_noise: 0.0,
            gyro_noise: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let all = self
            .camera
            .iter()
            .chain(self.lidar.iter())
            .chain([&self.accel_noise, &self.gyro_noise]);
        for &std in all {
            if !(std.is_finite() && std >= 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "sensor noise must be finite and non-negative, got {std}"
                )));
            }
        }
        Ok(())
    }
}

/// How the camera and LiDAR readings are combined each tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FusionStrategy {
    /// Plain average
    #[default]
    #[value(name = "equal_weight")]
    EqualWeight,
    /// Per-dimension 1/σ² weighting with the configured sensor noise
    #[value(name = "inverse_variance")]
    InverseVariance,
}

impl FusionStrategy {
    /// Build the fusion strategy for `sensors`
    pub fn build(&self, sensors: &SensorConfig) -> Result<Box<dyn ObservationFusion>> {
        Ok(match self {
            FusionStrategy::EqualWeight => Box::new(EqualWeightFusion),
            FusionStrategy::InverseVariance => Box::new(InverseVarianceFusion::new(
                sensors.pose_sensors().into_iter().map(|s| s.noise_std).collect(),
            )?),
        })
    }
}
