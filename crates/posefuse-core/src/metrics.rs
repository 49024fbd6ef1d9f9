//! Tracking error against ground truth

use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};
use crate::Pose;

/// Summary of one estimate series against ground truth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingErrors {
    /// Ticks excluded from the start of the series (transient)
    pub skipped: usize,
    /// Mean squared planar position error [m²]
    pub position_mse: f64,
    /// Root mean squared planar position error [m]
    pub position_rmse: f64,
    /// Root mean squared heading error [rad]
    pub heading_rmse: f64,
    /// Planar position error at the last tick [m]
    pub final_position_error: f64,
}

impl TrackingErrors {
    /// Compare `estimates` with `truth`, ignoring the first `skip` ticks
    pub fn compute(estimates: &[Pose], truth: &[Pose], skip: usize) -> Result<Self> {
        let position_mse = position_mse(estimates, truth, skip)?;
        let final_position_error = estimates
            .last()
            .zip(truth.last())
            .map(|(e, t)| planar_distance(e, t))
            .unwrap_or(0.0);

        Ok(Self {
            skipped: skip,
            position_mse,
            position_rmse: position_mse.sqrt(),
            heading_rmse: heading_rmse(estimates, truth, skip)?,
            final_position_error,
        })
    }
}

/// Mean squared planar position error over ticks `skip..`
///
/// Returns 0 for an empty window.
pub fn position_mse(estimates: &[Pose], truth: &[Pose], skip: usize) -> Result<f64> {
    mean_over(estimates, truth, skip, |e, t| {
        (e.x - t.x).powi(2) + (e.y - t.y).powi(2)
    })
}

pub fn position_rmse(estimates: &[Pose], truth: &[Pose], skip: usize) -> Result<f64> {
    position_mse(estimates, truth, skip).map(f64::sqrt)
}

/// Root mean squared heading error over ticks `skip..`
///
/// Headings are compared as-is, without wrapping.
pub fn heading_rmse(estimates: &[Pose], truth: &[Pose], skip: usize) -> Result<f64> {
    mean_over(estimates, truth, skip, |e, t| (e.z - t.z).powi(2)).map(f64::sqrt)
}

fn planar_distance(a: &Pose, b: &Pose) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn mean_over<F>(estimates: &[Pose], truth: &[Pose], skip: usize, f: F) -> Result<f64>
where
    F: Fn(&Pose, &Pose) -> f64,
{
    if estimates.len() != truth.len() {
        return Err(FusionError::shape(
            "estimate series",
            truth.len(),
            estimates.len(),
        ));
    }
    let window = estimates.len().saturating_sub(skip);
    if window == 0 {
        return Ok(0.0);
    }
    let total: f64 = estimates
        .iter()
        .zip(truth)
        .skip(skip)
        .map(|(e, t)| f(e, t))
        .sum();
    Ok(total / window as f64)
}
