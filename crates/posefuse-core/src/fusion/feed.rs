//! Input feeds for the fusion loop
//!
//! A feed is one control per tick plus one observation stream per sensor.
//! Everything is checked at this boundary, before the first tick runs.

use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};
use crate::motion::Control;
use crate::Pose;

/// Noisy pose observations of one sensor, one per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationStream {
    /// Sensor name (e.g. "camera", "lidar")
    pub name: String,
    /// Observed poses
    pub poses: Vec<Pose>,
}

impl ObservationStream {
    pub fn new(name: impl Into<String>, poses: Vec<Pose>) -> Self {
        Self {
            name: name.into(),
            poses,
        }
    }
}

/// Time-aligned controls and sensor observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFeed {
    /// Control input per tick
    pub controls: Vec<Control>,
    /// One stream per sensor
    pub streams: Vec<ObservationStream>,
}

impl SensorFeed {
    /// Create a validated feed
    pub fn new(controls: Vec<Control>, streams: Vec<ObservationStream>) -> Result<Self> {
        let feed = Self { controls, streams };
        feed.validate()?;
        Ok(feed)
    }

    /// Build a feed from raw numeric rows: `[v, ω]` per control and
    /// `[x, y, θ]` per observation
    pub fn from_rows(
        controls: &[Vec<f64>],
        streams: Vec<(String, Vec<Vec<f64>>)>,
    ) -> Result<Self> {
        let controls = controls
            .iter()
            .map(|row| match row.as_slice() {
                [v, omega] => Ok(Control::new(*v, *omega)),
                _ => Err(FusionError::shape("control row", 2, row.len())),
            })
            .collect::<Result<Vec<_>>>()?;

        let streams = streams
            .into_iter()
            .map(|(name, rows)| {
                let poses = rows
                    .iter()
                    .map(|row| match row.as_slice() {
                        [x, y, theta] => Ok(Pose::new(*x, *y, *theta)),
                        _ => Err(FusionError::shape(format!("{name} row"), 3, row.len())),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(ObservationStream::new(name, poses))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(controls, streams)
    }

    /// Check that there is at least one sensor, every control is finite
    /// and every stream has one observation per control
    pub fn validate(&self) -> Result<()> {
        if self.streams.is_empty() {
            return Err(FusionError::shape("sensor streams", 1, 0));
        }
        if let Some(tick) = self.controls.iter().position(|u| !u.is_finite()) {
            return Err(FusionError::NonFiniteControl { tick });
        }
        for stream in &self.streams {
            if stream.poses.len() != self.controls.len() {
                return Err(FusionError::shape(
                    format!("{} stream", stream.name),
                    self.controls.len(),
                    stream.poses.len(),
                ));
            }
        }
        Ok(())
    }

    /// Number of ticks
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Collect every sensor's reading for `tick` into `out`
    pub fn readings_at(&self, tick: usize, out: &mut Vec<Pose>) {
        out.clear();
        out.extend(self.streams.iter().map(|s| s.poses[tick]));
    }
}
