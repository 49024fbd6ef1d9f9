//! Seeded Gaussian noise source for the sensor models

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Noise generator with a fixed seed, so every simulated sensor series is
/// reproducible
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    rng: StdRng,
}

impl NoiseGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Zero-mean Gaussian sample with the given standard deviation
    ///
    /// A zero standard deviation returns exactly 0 and draws nothing.
    #[inline]
    pub fn gaussian(&mut self, stddev: f64) -> f64 {
        if stddev == 0.0 {
            return 0.0;
        }
        let n: f64 = self.rng.sample(StandardNormal);
        n * stddev
    }

    /// Independent Gaussian sample per component
    pub fn gaussian_vec3(&mut self, stddev: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            self.gaussian(stddev.x),
            self.gaussian(stddev.y),
            self.gaussian(stddev.z),
        )
    }
}
