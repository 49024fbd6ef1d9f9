use std::path::PathBuf;

use clap::Parser;

use crate::config::{FusionStrategy, SimConfig};
use crate::error::Result;

/// Circle-trajectory sensor fusion simulation (EKF vs. particle filter)
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON simulation config. Omitted fields keep their defaults.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seed for sensor noise and particle sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Simulated time in seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Number of particles
    #[arg(long)]
    pub particles: Option<usize>,

    /// How camera and LiDAR readings are combined
    #[arg(long, value_enum)]
    pub fusion: Option<FusionStrategy>,

    /// Write the full run report as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Verbose logging (DEBUG level)
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Config file (or defaults) with the command-line overrides applied
    pub fn load_config(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_json_file(path)?,
            None => SimConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(duration) = self.duration {
            config.duration = duration;
        }
        if let Some(particles) = self.particles {
            config.filters.particle_filter.num_particles = particles;
        }
        if let Some(fusion) = self.fusion {
            config.fusion = fusion;
        }

        config.validate()?;
        Ok(config)
    }
}
