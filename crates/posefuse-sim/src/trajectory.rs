//! Ground-truth trajectories
//!
//! A [`GroundTruth`] is the pose at every tick plus the control that the
//! robot actually applied. Two sources are provided:
//!
//! - [`CircleTrajectory`]: constant-speed circle around the origin,
//!   counterclockwise, starting at `(r, 0)` heading `π/2`
//! - [`GroundTruth::dead_reckoning`]: the shared motion model integrated
//!   from a start pose, so it agrees exactly with the estimators' prediction

use std::f64::consts::FRAC_PI_2;

use posefuse_core::{motion, Control, Pose};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Reference poses and true controls, one per tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    /// Tick length [s]
    pub dt: f64,
    /// Time stamp of each pose [s]
    pub times: Vec<f64>,
    /// True pose per tick. Heading is continuous, not wrapped to (-π, π].
    pub poses: Vec<Pose>,
    /// True (v, ω) per tick
    pub controls: Vec<Control>,
}

impl GroundTruth {
    /// Integrate `controls` from `start` with the unicycle model
    ///
    /// `poses[k]` is the pose after applying `controls[0..=k]`, at time
    /// `(k + 1)·dt`, which is what the fusion loop observes at tick `k`.
    pub fn dead_reckoning(start: &Pose, controls: Vec<Control>, dt: f64) -> Result<Self> {
        check_dt(dt)?;

        let mut pose = *start;
        let poses = controls
            .iter()
            .map(|u| {
                pose = motion::propagate(&pose, u, dt);
                pose
            })
            .collect();
        let times = (1..=controls.len()).map(|k| k as f64 * dt).collect();

        Ok(Self {
            dt,
            times,
            poses,
            controls,
        })
    }

    /// Number of ticks
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Time covered [s]
    pub fn duration(&self) -> f64 {
        match (self.times.first(), self.times.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

/// Constant-speed circle around the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleTrajectory {
    /// Radius [m]
    pub radius: f64,
    /// Linear speed [m/s]
    pub speed: f64,
}

impl Default for CircleTrajectory {
    fn default() -> Self {
        Self {
            radius: 5.0,
            speed: 1.0,
        }
    }
}

impl CircleTrajectory {
    pub fn new(radius: f64, speed: f64) -> Self {
        Self { radius, speed }
    }

    /// Angular rate ω = speed / radius [rad/s]
    pub fn angular_rate(&self) -> f64 {
        self.speed / self.radius
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "trajectory.radius must be finite and positive, got {}",
                self.radius
            )));
        }
        if !self.speed.is_finite() {
            return Err(SimError::InvalidConfig("trajectory.speed must be finite".into()));
        }
        Ok(())
    }

    /// Sample the circle at `t = k·dt` for every `k·dt < duration`
    pub fn generate(&self, dt: f64, duration: f64) -> Result<GroundTruth> {
        self.validate()?;
        check_dt(dt)?;
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "duration must be finite and non-negative, got {duration}"
            )));
        }

        let omega = self.angular_rate();
        // Tolerance keeps 31.5 / 0.1 at 315 ticks despite round-off
        let ticks = (duration / dt - 1e-9).ceil().max(0.0) as usize;

        let times: Vec<f64> = (0..ticks).map(|k| k as f64 * dt).collect();
        let poses = times
            .iter()
            .map(|&t| {
                let phase = omega * t;
                Pose::new(
                    self.radius * phase.cos(),
                    self.radius * phase.sin(),
                    phase + FRAC_PI_2,
                )
            })
            .collect();

        Ok(GroundTruth {
            dt,
            times,
            poses,
            controls: vec![Control::new(self.speed, omega); ticks],
        })
    }
}

fn check_dt(dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidConfig(format!(
            "dt must be finite and positive, got {dt}"
        )))
    }
}
