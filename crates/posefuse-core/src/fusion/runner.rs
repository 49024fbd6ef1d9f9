//! Fusion loop driver
//!
//! Runs both estimators against a common timeline. Every tick, in this order:
//!
//! 1. read the control and the raw sensor readings
//! 2. fuse the readings into one observation
//! 3. predict both estimators
//! 4. update both estimators
//! 5. resample the particle filter
//! 6. record both estimates
//!
//! Reordering changes the numerical results, so the order is fixed here and
//! nowhere else.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::feed::SensorFeed;
use super::strategy::{EqualWeightFusion, ObservationFusion};
use crate::error::Result;
use crate::estimation::PoseEstimator;
use crate::motion::Control;
use crate::Pose;

/// Estimates produced by one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickEstimate {
    /// Fused observation fed to both estimators
    pub fused: Pose,
    /// EKF state after the update
    pub ekf: Pose,
    /// Particle filter mean after resampling
    pub pf: Pose,
}

/// Estimate series, one entry per tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionOutput {
    pub ekf: Vec<Pose>,
    pub pf: Vec<Pose>,
    pub fused: Vec<Pose>,
}

impl FusionOutput {
    pub fn with_capacity(ticks: usize) -> Self {
        Self {
            ekf: Vec::with_capacity(ticks),
            pf: Vec::with_capacity(ticks),
            fused: Vec::with_capacity(ticks),
        }
    }

    /// Record a tick
    pub fn record(&mut self, tick: &TickEstimate) {
        self.ekf.push(tick.ekf);
        self.pf.push(tick.pf);
        self.fused.push(tick.fused);
    }

    /// Number of recorded ticks
    pub fn len(&self) -> usize {
        self.ekf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ekf.is_empty()
    }
}

/// Per-tick driver for an EKF-like and a particle-filter-like estimator
#[derive(Debug, Clone, Default)]
pub struct FusionLoop<F = EqualWeightFusion> {
    fusion: F,
}

impl<F: ObservationFusion> FusionLoop<F> {
    pub fn new(fusion: F) -> Self {
        Self { fusion }
    }

    /// Run one tick
    pub fn step<E, P>(
        &self,
        ekf: &mut E,
        pf: &mut P,
        control: &Control,
        readings: &[Pose],
        rng: &mut dyn RngCore,
    ) -> Result<TickEstimate>
    where
        E: PoseEstimator + ?Sized,
        P: PoseEstimator + ?Sized,
    {
        let z = self.fusion.fuse(readings)?;

        ekf.predict(control, rng);
        pf.predict(control, rng);

        ekf.update(&z)?;
        pf.update(&z)?;

        pf.resample(rng);

        Ok(TickEstimate {
            fused: z,
            ekf: ekf.estimate(),
            pf: pf.estimate(),
        })
    }

    /// Run every tick of `feed`, stopping at the first error
    pub fn run<E, P>(
        &self,
        ekf: &mut E,
        pf: &mut P,
        feed: &SensorFeed,
        rng: &mut dyn RngCore,
    ) -> Result<FusionOutput>
    where
        E: PoseEstimator + ?Sized,
        P: PoseEstimator + ?Sized,
    {
        feed.validate()?;

        let mut output = FusionOutput::with_capacity(feed.len());
        let mut readings = Vec::with_capacity(feed.streams.len());

        for (tick, control) in feed.controls.iter().enumerate() {
            feed.readings_at(tick, &mut readings);

            let estimate = self
                .step(ekf, pf, control, &readings, rng)
                .inspect_err(|err| warn!(tick, %err, "Fusion loop aborted"))?;

            debug!(
                tick,
                ekf_x = estimate.ekf.x,
                ekf_y = estimate.ekf.y,
                pf_x = estimate.pf.x,
                pf_y = estimate.pf.y,
                "tick"
            );
            output.record(&estimate);
        }

        Ok(output)
    }
}
