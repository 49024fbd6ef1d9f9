//! Filter configuration
//!
//! Everything the estimators consume at construction time. Defaults
//! are tuned for 10 Hz ticks: unit prior covariance,
//! Q = diag(0.01, 0.01, 0.01), R = diag(0.1, 0.1, 0.05), 500 particles.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};

/// Configuration for both estimators
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Extended Kalman Filter settings
    pub ekf: EkfConfig,
    /// Particle filter settings
    pub particle_filter: ParticleFilterConfig,
}

impl FilterConfig {
    /// Set the tick length of both estimators
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.ekf.dt = dt;
        self.particle_filter.dt = dt;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.ekf.validate()?;
        self.particle_filter.validate()
    }
}

/// Extended Kalman Filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EkfConfig {
    /// Tick length [s]
    pub dt: f64,
    /// Prior mean
    pub initial_state: Vector3<f64>,
    /// Prior covariance is `initial_covariance_scale · I`
    pub initial_covariance_scale: f64,
    /// Diagonal of the process noise covariance Q
    pub process_noise: Vector3<f64>,
    /// Diagonal of the measurement noise covariance R
    pub measurement_noise: Vector3<f64>,
}

impl Default for EkfConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            initial_state: Vector3::zeros(),
            initial_covariance_scale: 1.0,
            process_noise: Vector3::new(0.01, 0.01, 0.01),
            measurement_noise: Vector3::new(0.1, 0.1, 0.05),
        }
    }
}

impl EkfConfig {
    pub fn validate(&self) -> Result<()> {
        check_dt("ekf.dt", self.dt)?;
        check_non_negative("ekf.initial_covariance_scale", self.initial_covariance_scale)?;
        check_finite("ekf.initial_state", &self.initial_state)?;
        check_non_negative_vec("ekf.process_noise", &self.process_noise)?;
        check_non_negative_vec("ekf.measurement_noise", &self.measurement_noise)
    }
}

/// Particle filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleFilterConfig {
    /// Number of particles N, fixed for the filter's lifetime
    pub num_particles: usize,
    /// Tick length [s]
    pub dt: f64,
    /// Pose every particle is seeded at
    pub initial_state: Vector3<f64>,
    /// Std dev of the Gaussian scatter applied to the seeds (zero keeps them stacked)
    pub initial_spread: Vector3<f64>,
    /// Per-dimension process noise std dev (σx, σy, σθ)
    pub process_noise: Vector3<f64>,
    /// Measurement noise scale (Rx, Ry, Rθ); only Rx enters the likelihood
    pub measurement_noise: Vector3<f64>,
}

impl Default for ParticleFilterConfig {
    fn default() -> Self {
        Self {
            num_particles: 500,
            dt: 0.1,
            initial_state: Vector3::zeros(),
            initial_spread: Vector3::zeros(),
            process_noise: Vector3::new(0.1, 0.1, 0.05),
            measurement_noise: Vector3::new(0.1, 0.1, 0.05),
        }
    }
}

impl ParticleFilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_particles == 0 {
            return Err(FusionError::InvalidConfig(
                "particle_filter.num_particles must be at least 1".into(),
            ));
        }
        check_dt("particle_filter.dt", self.dt)?;
        check_finite("particle_filter.initial_state", &self.initial_state)?;
        check_non_negative_vec("particle_filter.initial_spread", &self.initial_spread)?;
        check_non_negative_vec("particle_filter.process_noise", &self.process_noise)?;
        check_non_negative_vec("particle_filter.measurement_noise", &self.measurement_noise)
    }
}

fn check_dt(name: &str, dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(FusionError::InvalidConfig(format!(
            "{name} must be finite and positive, got {dt}"
        )))
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FusionError::InvalidConfig(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

fn check_non_negative_vec(name: &str, v: &Vector3<f64>) -> Result<()> {
    v.iter().try_for_each(|&value| check_non_negative(name, value))
}

fn check_finite(name: &str, v: &Vector3<f64>) -> Result<()> {
    if v.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(FusionError::InvalidConfig(format!("{name} must be finite")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FilterConfig::default();
        assert_eq!(config.ekf.dt, 0.1);
        assert_eq!(config.particle_filter.num_particles, 500);
        assert_eq!(config.ekf.measurement_noise, Vector3::new(0.1, 0.1, 0.05));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_dt_sets_both() {
        let config = FilterConfig::default().with_dt(0.05);
        assert_eq!(config.ekf.dt, 0.05);
        assert_eq!(config.particle_filter.dt, 0.05);
    }

    #[test]
    fn test_rejects_zero_particles() {
        let mut config = ParticleFilterConfig::default();
        config.num_particles = 0;
        assert!(matches!(config.validate(), Err(FusionError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        let mut config = EkfConfig::default();
        config.dt = 0.0;
        assert!(config.validate().is_err());
        config.dt = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_noise() {
        let mut config = EkfConfig::default();
        config.process_noise = Vector3::new(0.01, -0.01, 0.01);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_noise_is_valid() {
        let mut config = FilterConfig::default();
        config.ekf.process_noise = Vector3::zeros();
        config.ekf.measurement_noise = Vector3::zeros();
        config.particle_filter.process_noise = Vector3::zeros();
        config.particle_filter.measurement_noise = Vector3::zeros();
        assert!(config.validate().is_ok());
    }
}
