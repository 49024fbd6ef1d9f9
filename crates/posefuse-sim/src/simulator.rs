//! Main simulation runner
//!
//! Generates the ground truth, synthesizes camera, LiDAR and IMU data from
//! it, then runs both estimators through the fusion loop and scores them.

use posefuse_core::metrics::TrackingErrors;
use posefuse_core::{
    Control, ExtendedKalmanFilter, FusionLoop, ObservationStream, ParticleFilter, Pose,
    SensorFeed,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::error::Result;
use crate::noise::NoiseGenerator;
use crate::sensors::ImuMeasurement;
use crate::trajectory::GroundTruth;

/// Everything one run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimReport {
    pub config: SimConfig,
    pub truth: GroundTruth,
    /// Raw observation stream per pose sensor
    pub observations: Vec<ObservationStream>,
    pub imu: Vec<ImuMeasurement>,
    /// Controls fed to the estimators: nominal speed and IMU yaw rate
    pub controls: Vec<Control>,
    pub ekf: Vec<Pose>,
    pub pf: Vec<Pose>,
    /// Fused observation per tick
    pub fused: Vec<Pose>,
    pub ekf_errors: TrackingErrors,
    pub pf_errors: TrackingErrors,
}

impl SimReport {
    /// Number of simulated ticks
    pub fn len(&self) -> usize {
        self.truth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.truth.is_empty()
    }
}

/// Simulation runner
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimConfig,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run the configured circle scenario
    pub fn run(&self) -> Result<SimReport> {
        let truth = self
            .config
            .trajectory
            .generate(self.config.dt, self.config.duration)?;
        self.run_on(&truth)
    }

    /// Run against an arbitrary ground truth
    ///
    /// Sensor noise and particle sampling are seeded from the config, so two
    /// calls with the same truth give identical reports.
    pub fn run_on(&self, truth: &GroundTruth) -> Result<SimReport> {
        let config = &self.config;
        let mut noise = NoiseGenerator::new(config.seed);
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));

        let observations: Vec<ObservationStream> = config
            .sensors
            .pose_sensors()
            .into_iter()
            .map(|sensor| {
                let poses = sensor.observe(&truth.poses, &mut noise);
                ObservationStream::new(sensor.name, poses)
            })
            .collect();

        let imu = config.sensors.imu(truth.dt).generate(&truth.poses, &mut noise);
        let controls: Vec<Control> = truth
            .controls
            .iter()
            .zip(&imu)
            .map(|(u, m)| Control::new(u.v, m.angular_velocity))
            .collect();

        let feed = SensorFeed::new(controls, observations)?;
        debug!(ticks = feed.len(), sensors = feed.streams.len(), "Sensor data generated");

        let filters = config.filters.clone().with_dt(truth.dt);
        let mut ekf = ExtendedKalmanFilter::new(&filters.ekf)?;
        let mut pf = ParticleFilter::new(&filters.particle_filter, &mut rng)?;
        let fusion_loop = FusionLoop::new(config.fusion.build(&config.sensors)?);

        let output = fusion_loop.run(&mut ekf, &mut pf, &feed, &mut rng)?;

        let skip = config.transient_ticks;
        let ekf_errors = TrackingErrors::compute(&output.ekf, &truth.poses, skip)?;
        let pf_errors = TrackingErrors::compute(&output.pf, &truth.poses, skip)?;

        info!(
            ticks = output.len(),
            fusion = ?config.fusion,
            ekf_rmse = ekf_errors.position_rmse,
            pf_rmse = pf_errors.position_rmse,
            "Simulation finished"
        );

        let SensorFeed { controls, streams } = feed;
        Ok(SimReport {
            config: config.clone(),
            truth: truth.clone(),
            observations: streams,
            imu,
            controls,
            ekf: output.ekf,
            pf: output.pf,
            fused: output.fused,
            ekf_errors,
            pf_errors,
        })
    }
}
