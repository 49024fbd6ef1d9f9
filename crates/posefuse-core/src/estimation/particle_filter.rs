//! Sampling-Importance-Resampling particle filter
//!
//! The belief is a weighted set of N pose samples. Each tick:
//!
//! 1. **predict**: every particle integrates the motion model with its own
//!    heading, then receives independent Gaussian process noise
//! 2. **update**: weights are multiplied by a Gaussian kernel on the planar
//!    distance to the observation, floored and normalized
//! 3. **resample**: N draws with replacement from the weight distribution
//!    (multinomial), weights reset to 1/N
//!
//! The likelihood kernel uses only the first measurement-noise component as
//! its bandwidth and ignores heading. Heading is corrected only indirectly,
//! through which particles survive resampling.
//!
//! All buffers are sized once at construction; N never changes.

use nalgebra::Vector3;
use rand::{Rng, RngCore};
use rand_distr::{Distribution, StandardNormal};
use tracing::{debug, warn};

use super::PoseEstimator;
use crate::config::ParticleFilterConfig;
use crate::error::{FusionError, Result};
use crate::motion::{self, Control};
use crate::Pose;

/// Added to every weight before normalization so the total never collapses to zero
pub const WEIGHT_FLOOR: f64 = 1e-300;

/// Particle filter over a planar pose
#[derive(Debug, Clone)]
pub struct ParticleFilter {
    particles: Vec<Pose>,
    weights: Vec<f64>,
    dt: f64,
    /// Default per-dimension process noise std dev used by [`PoseEstimator::predict`]
    pub process_noise: Vector3<f64>,
    /// Default measurement noise scale used by [`PoseEstimator::update`]
    pub measurement_noise: Vector3<f64>,
    // Scratch buffers reused every tick
    resampled: Vec<Pose>,
    cumulative: Vec<f64>,
    candidate: Vec<f64>,
}

impl ParticleFilter {
    /// Create a filter with every particle seeded at the configured initial
    /// state, scattered by `initial_spread`
    pub fn new<R: Rng + ?Sized>(config: &ParticleFilterConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let particles = (0..config.num_particles)
            .map(|_| config.initial_state + gaussian_noise(&config.initial_spread, rng))
            .collect();
        Ok(Self::with_buffers(particles, config))
    }

    /// Create a filter from an explicit particle set (N = `particles.len()`)
    pub fn from_particles(config: &ParticleFilterConfig, particles: Vec<Pose>) -> Result<Self> {
        let mut config = config.clone();
        config.num_particles = particles.len();
        config.validate()?;
        Ok(Self::with_buffers(particles, &config))
    }

    fn with_buffers(particles: Vec<Pose>, config: &ParticleFilterConfig) -> Self {
        let n = particles.len();
        Self {
            particles,
            weights: vec![1.0 / n as f64; n],
            dt: config.dt,
            process_noise: config.process_noise,
            measurement_noise: config.measurement_noise,
            resampled: Vec::with_capacity(n),
            cumulative: Vec::with_capacity(n),
            candidate: Vec::with_capacity(n),
        }
    }

    /// Prediction step
    ///
    /// `noise` holds the std dev (σx, σy, σθ) of the zero-mean Gaussian added
    /// to each particle after the deterministic motion update.
    pub fn predict<R: Rng + ?Sized>(&mut self, u: &Control, noise: &Vector3<f64>, rng: &mut R) {
        for particle in &mut self.particles {
            *particle = motion::propagate(particle, u, self.dt) + gaussian_noise(noise, rng);
        }
    }

    /// Update step: importance reweighting against a pose observation
    ///
    /// `r` is the measurement noise scale (Rx, Ry, Rθ). Only Rx is used, as
    /// the bandwidth of `exp(-d² / (2·Rx²))` where `d` is the planar distance.
    /// With Rx = 0 the kernel is the indicator of `d == 0`.
    ///
    /// Fails with [`FusionError::DegenerateWeights`] when the floored weights
    /// still cannot be normalized (non-finite inputs); the weights are left
    /// untouched in that case.
    pub fn update(&mut self, z: &Pose, r: &Vector3<f64>) -> Result<()> {
        let two_var = 2.0 * r.x * r.x;

        self.candidate.clear();
        let mut collapsed = true;
        for (particle, &weight) in self.particles.iter().zip(&self.weights) {
            let d2 = (particle.x - z.x).powi(2) + (particle.y - z.y).powi(2);
            let likelihood = if two_var > 0.0 {
                (-d2 / two_var).exp()
            } else if d2 == 0.0 {
                1.0
            } else {
                0.0
            };
            let w = weight * likelihood;
            if w > 0.0 {
                collapsed = false;
            }
            self.candidate.push(w + WEIGHT_FLOOR);
        }

        let sum: f64 = self.candidate.iter().sum();
        if !sum.is_finite() || sum <= 0.0 {
            return Err(FusionError::DegenerateWeights { sum });
        }

        if collapsed {
            warn!(
                particles = self.particles.len(),
                "Particle filter: every likelihood underflowed, weights fell back to the floor"
            );
        }

        for (w, c) in self.weights.iter_mut().zip(&self.candidate) {
            *w = c / sum;
        }

        debug!(ess = self.effective_sample_size(), "PF update");
        Ok(())
    }

    /// Multinomial resampling
    ///
    /// Draws N indices i.i.d. from the weight distribution, replaces the
    /// particle set with the selected particles and resets the weights to 1/N.
    pub fn resample<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let n = self.particles.len();

        self.cumulative.clear();
        let mut running = 0.0;
        for &w in &self.weights {
            running += w;
            self.cumulative.push(running);
        }

        // Round-off can leave u just past the last cumulative value
        let last_positive = self
            .weights
            .iter()
            .rposition(|&w| w > 0.0)
            .unwrap_or(n - 1);

        self.resampled.clear();
        for _ in 0..n {
            let u = rng.random::<f64>() * running;
            let idx = self
                .cumulative
                .partition_point(|&c| c <= u)
                .min(last_positive);
            self.resampled.push(self.particles[idx]);
        }

        std::mem::swap(&mut self.particles, &mut self.resampled);
        self.weights.fill(1.0 / n as f64);
    }

    /// Unweighted mean of the particles
    ///
    /// Called after resampling, when replication density already encodes the
    /// weight distribution.
    pub fn estimate(&self) -> Pose {
        self.particles.iter().sum::<Pose>() / self.particles.len() as f64
    }

    /// Weighted mean of the particles
    pub fn weighted_estimate(&self) -> Pose {
        self.particles
            .iter()
            .zip(&self.weights)
            .map(|(p, &w)| p * w)
            .sum()
    }

    /// Effective sample size `1 / Σ wᵢ²`
    pub fn effective_sample_size(&self) -> f64 {
        1.0 / self.weights.iter().map(|w| w * w).sum::<f64>()
    }

    /// Replace the weights, normalizing them to sum to 1
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<()> {
        if weights.len() != self.particles.len() {
            return Err(FusionError::shape(
                "particle weights",
                self.particles.len(),
                weights.len(),
            ));
        }
        let sum: f64 = weights.iter().sum();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || !(sum > 0.0) {
            return Err(FusionError::DegenerateWeights { sum });
        }
        for (dst, &w) in self.weights.iter_mut().zip(weights) {
            *dst = w / sum;
        }
        Ok(())
    }

    pub fn particles(&self) -> &[Pose] {
        &self.particles
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Number of particles N
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Always false: N ≥ 1 is enforced at construction
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Tick length [s]
    pub fn dt(&self) -> f64 {
        self.dt
    }
}

impl PoseEstimator for ParticleFilter {
    fn predict(&mut self, control: &Control, rng: &mut dyn RngCore) {
        let noise = self.process_noise;
        ParticleFilter::predict(self, control, &noise, rng);
    }

    fn update(&mut self, observation: &Pose) -> Result<()> {
        let r = self.measurement_noise;
        ParticleFilter::update(self, observation, &r)
    }

    fn resample(&mut self, rng: &mut dyn RngCore) {
        ParticleFilter::resample(self, rng);
    }

    fn estimate(&self) -> Pose {
        ParticleFilter::estimate(self)
    }
}

/// Independent zero-mean Gaussian per dimension; a zero std dev adds exactly zero
fn gaussian_noise<R: Rng + ?Sized>(std: &Vector3<f64>, rng: &mut R) -> Vector3<f64> {
    std.map(|sigma| {
        if sigma == 0.0 {
            0.0
        } else {
            let n: f64 = StandardNormal.sample(rng);
            n * sigma
        }
    })
}
