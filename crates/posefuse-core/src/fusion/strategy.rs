//! Observation fusion strategies
//!
//! The estimators only ever see one fused observation per tick. The default
//! is an equal-weight average of the sensors ("early fusion"), which ignores
//! each sensor's noise level; [`InverseVarianceFusion`] weights every
//! dimension by `1/σ²` instead and can be swapped in without touching the
//! estimators.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};
use crate::Pose;

/// Combines the raw readings of one tick into a single observation
pub trait ObservationFusion {
    fn fuse(&self, readings: &[Pose]) -> Result<Pose>;
}

impl<T: ObservationFusion + ?Sized> ObservationFusion for Box<T> {
    fn fuse(&self, readings: &[Pose]) -> Result<Pose> {
        (**self).fuse(readings)
    }
}

/// Arithmetic mean of all readings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualWeightFusion;

impl ObservationFusion for EqualWeightFusion {
    fn fuse(&self, readings: &[Pose]) -> Result<Pose> {
        if readings.is_empty() {
            return Err(FusionError::shape("fused readings", 1, 0));
        }
        Ok(readings.iter().sum::<Pose>() / readings.len() as f64)
    }
}

/// Per-dimension inverse-variance weighted mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverseVarianceFusion {
    sensor_std: Vec<Vector3<f64>>,
}

impl InverseVarianceFusion {
    /// `sensor_std[i]` is the noise std dev (σx, σy, σθ) of sensor `i`
    pub fn new(sensor_std: Vec<Vector3<f64>>) -> Result<Self> {
        if sensor_std.is_empty() {
            return Err(FusionError::InvalidConfig(
                "inverse-variance fusion needs at least one sensor".into(),
            ));
        }
        if sensor_std
            .iter()
            .flat_map(|s| s.iter())
            .any(|&s| !s.is_finite() || s <= 0.0)
        {
            return Err(FusionError::InvalidConfig(
                "inverse-variance fusion needs positive, finite sensor std devs".into(),
            ));
        }
        Ok(Self { sensor_std })
    }

    /// Std dev of the fused observation, per dimension
    pub fn fused_std(&self) -> Vector3<f64> {
        self.information().map(|info| (1.0 / info).sqrt())
    }

    fn information(&self) -> Vector3<f64> {
        self.sensor_std
            .iter()
            .map(|s| s.map(|sigma| 1.0 / (sigma * sigma)))
            .sum()
    }
}

impl ObservationFusion for InverseVarianceFusion {
    fn fuse(&self, readings: &[Pose]) -> Result<Pose> {
        if readings.len() != self.sensor_std.len() {
            return Err(FusionError::shape(
                "fused readings",
                self.sensor_std.len(),
                readings.len(),
            ));
        }

        let weighted: Vector3<f64> = readings
            .iter()
            .zip(&self.sensor_std)
            .map(|(z, s)| z.component_div(&s.component_mul(s)))
            .sum();

        Ok(weighted.component_div(&self.information()))
    }
}
