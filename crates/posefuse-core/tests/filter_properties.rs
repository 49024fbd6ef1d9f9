//! Estimator and fusion loop properties
//!
//! These tests check behavior that must hold for any run:
//! 1. EKF covariance stays a valid covariance
//! 2. Particle weights and particle count are preserved
//! 3. The fusion loop calls the estimators in a fixed order
//! 4. Noise-free inputs reproduce dead reckoning exactly, whatever the prior
//! 5. Errors surface from the loop instead of producing garbage estimates

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use posefuse_core::fusion::{EqualWeightFusion, InverseVarianceFusion, ObservationFusion};
use posefuse_core::{
    motion, Control, EkfConfig, ExtendedKalmanFilter, FilterConfig, FusionError, FusionLoop,
    ObservationStream, ParticleFilter, ParticleFilterConfig, Pose, PoseEstimator, Result,
    SensorFeed,
};

/// Dead-reckoned path from the origin under a constant turn
fn turning_path(ticks: usize, dt: f64) -> (Vec<Control>, Vec<Pose>) {
    let controls = vec![Control::new(1.0, 0.3); ticks];
    let mut pose = Pose::zeros();
    let truth = controls
        .iter()
        .map(|u| {
            pose = motion::propagate(&pose, u, dt);
            pose
        })
        .collect();
    (controls, truth)
}

mod covariance_tests {
    use super::*;

    #[test]
    fn test_covariance_stays_symmetric_psd() {
        let mut ekf = ExtendedKalmanFilter::new(&EkfConfig::default()).unwrap();
        let (controls, truth) = turning_path(300, 0.1);

        for (k, (u, z)) in controls.iter().zip(&truth).enumerate() {
            ekf.predict(u);
            let wobble = Pose::new(0.05 * (k as f64).sin(), -0.05 * (k as f64).cos(), 0.0);
            ekf.update(&(z + wobble)).unwrap();

            let p = ekf.covariance();
            assert_relative_eq!(*p, p.transpose(), epsilon = 1e-12);
            let eigenvalues = p.symmetric_eigen().eigenvalues;
            assert!(
                eigenvalues.iter().all(|&l| l >= -1e-12),
                "tick {k}: eigenvalues {eigenvalues:?}"
            );
        }
    }

    #[test]
    fn test_uncertainty_never_shrinks_without_observations() {
        // F is unit upper-triangular, so det(F P Fᵗ) = det(P) and adding Q
        // can only grow it
        let mut ekf = ExtendedKalmanFilter::new(&EkfConfig::default()).unwrap();
        let mut previous = ekf.covariance().determinant();

        for k in 0..100 {
            ekf.predict(&Control::new(1.5, 0.4 * (k as f64 * 0.1).sin()));
            let det = ekf.covariance().determinant();
            assert!(det >= previous * (1.0 - 1e-12), "tick {k}: {det} < {previous}");
            previous = det;
        }
    }

    #[test]
    fn test_trace_grows_on_straight_line() {
        let mut ekf = ExtendedKalmanFilter::new(&EkfConfig::default()).unwrap();
        let mut previous = ekf.covariance().trace();

        for _ in 0..50 {
            ekf.predict(&Control::new(1.0, 0.0));
            let trace = ekf.covariance().trace();
            assert!(trace > previous);
            previous = trace;
        }
    }
}

mod particle_tests {
    use super::*;

    fn config(n: usize) -> ParticleFilterConfig {
        ParticleFilterConfig {
            num_particles: n,
            initial_spread: Vector3::new(1.0, 1.0, 0.3),
            ..Default::default()
        }
    }

    #[test]
    fn test_weights_stay_normalized() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut pf = ParticleFilter::new(&config(300), &mut rng).unwrap();
        let (controls, truth) = turning_path(50, 0.1);

        for (u, z) in controls.iter().zip(&truth) {
            PoseEstimator::predict(&mut pf, u, &mut rng);
            PoseEstimator::update(&mut pf, z).unwrap();

            let sum: f64 = pf.weights().iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
            assert!(pf.weights().iter().all(|&w| w >= 0.0));

            pf.resample(&mut rng);
        }
    }

    #[test]
    fn test_particle_count_is_fixed() {
        let mut rng = StdRng::seed_from_u64(12);
        for n in [1, 3, 64, 500] {
            let mut pf = ParticleFilter::new(&config(n), &mut rng).unwrap();
            for k in 0..20 {
                PoseEstimator::predict(&mut pf, &Control::new(1.0, 0.1), &mut rng);
                PoseEstimator::update(&mut pf, &Pose::new(0.1 * k as f64, 0.0, 0.0)).unwrap();
                PoseEstimator::resample(&mut pf, &mut rng);
                assert_eq!(pf.len(), n);
                assert_eq!(pf.weights().len(), n);
            }
        }
    }

    #[test]
    fn test_concentrated_weight_copies_one_particle() {
        let mut rng = StdRng::seed_from_u64(13);
        let particles: Vec<Pose> = (0..10).map(|i| Pose::new(i as f64, 0.0, 0.0)).collect();
        let mut pf = ParticleFilter::from_particles(&ParticleFilterConfig::default(), particles)
            .unwrap();

        let mut weights = vec![0.0; 10];
        weights[6] = 1.0;
        pf.set_weights(&weights).unwrap();
        pf.resample(&mut rng);

        assert!(pf.particles().iter().all(|p| *p == Pose::new(6.0, 0.0, 0.0)));
        assert!(pf.weights().iter().all(|&w| w == 0.1));
    }
}

mod ordering_tests {
    use super::*;

    type CallLog = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: CallLog,
        last_observation: Option<Pose>,
    }

    impl Recorder {
        fn new(name: &'static str, log: &CallLog) -> Self {
            Self {
                name,
                log: Rc::clone(log),
                last_observation: None,
            }
        }
    }

    impl PoseEstimator for Recorder {
        fn predict(&mut self, _control: &Control, _rng: &mut dyn RngCore) {
            self.log.borrow_mut().push(format!("{}.predict", self.name));
        }

        fn update(&mut self, observation: &Pose) -> Result<()> {
            self.last_observation = Some(*observation);
            self.log.borrow_mut().push(format!("{}.update", self.name));
            Ok(())
        }

        fn resample(&mut self, _rng: &mut dyn RngCore) {
            self.log.borrow_mut().push(format!("{}.resample", self.name));
        }

        fn estimate(&self) -> Pose {
            self.last_observation.unwrap_or_else(Pose::zeros)
        }
    }

    #[test]
    fn test_tick_order() {
        let log = CallLog::default();
        let mut ekf = Recorder::new("ekf", &log);
        let mut pf = Recorder::new("pf", &log);
        let mut rng = StdRng::seed_from_u64(0);

        let feed = SensorFeed::new(
            vec![Control::new(1.0, 0.0); 2],
            vec![
                ObservationStream::new("camera", vec![Pose::new(1.0, 0.0, 0.0); 2]),
                ObservationStream::new("lidar", vec![Pose::new(3.0, 2.0, 0.0); 2]),
            ],
        )
        .unwrap();

        let output = FusionLoop::new(EqualWeightFusion)
            .run(&mut ekf, &mut pf, &feed, &mut rng)
            .unwrap();

        let tick = [
            "ekf.predict",
            "pf.predict",
            "ekf.update",
            "pf.update",
            "pf.resample",
        ];
        let expected: Vec<String> = tick.iter().chain(&tick).map(|s| s.to_string()).collect();
        assert_eq!(*log.borrow(), expected);

        // Both estimators receive the same fused observation
        assert_eq!(ekf.last_observation, Some(Pose::new(2.0, 1.0, 0.0)));
        assert_eq!(pf.last_observation, ekf.last_observation);
        assert_eq!(output.fused, vec![Pose::new(2.0, 1.0, 0.0); 2]);
    }

    #[test]
    fn test_boxed_estimators() {
        let log = CallLog::default();
        let mut ekf: Box<dyn PoseEstimator> = Box::new(Recorder::new("ekf", &log));
        let mut pf: Box<dyn PoseEstimator> = Box::new(Recorder::new("pf", &log));
        let mut rng = StdRng::seed_from_u64(0);

        FusionLoop::new(EqualWeightFusion)
            .step(
                ekf.as_mut(),
                pf.as_mut(),
                &Control::default(),
                &[Pose::zeros()],
                &mut rng,
            )
            .unwrap();
        assert_eq!(log.borrow().len(), 5);
    }
}

mod degenerate_tests {
    use super::*;

    fn zero_noise_ekf(dt: f64, initial_state: Pose) -> ExtendedKalmanFilter {
        let config = EkfConfig {
            dt,
            initial_state,
            process_noise: Vector3::zeros(),
            measurement_noise: Vector3::zeros(),
            ..Default::default()
        };
        ExtendedKalmanFilter::new(&config).unwrap()
    }

    fn truth_feed(controls: Vec<Control>, truth: &[Pose]) -> SensorFeed {
        SensorFeed::new(
            controls,
            vec![
                ObservationStream::new("camera", truth.to_vec()),
                ObservationStream::new("lidar", truth.to_vec()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_zero_noise_reproduces_dead_reckoning() {
        let dt = 0.1;
        let (controls, truth) = turning_path(100, dt);

        let pf_config = ParticleFilterConfig {
            num_particles: 1,
            dt,
            process_noise: Vector3::zeros(),
            measurement_noise: Vector3::zeros(),
            ..Default::default()
        };

        let mut rng = StdRng::seed_from_u64(0);
        // Unit prior: the first update runs with a full gain
        let mut ekf = zero_noise_ekf(dt, Pose::zeros());
        let mut pf = ParticleFilter::new(&pf_config, &mut rng).unwrap();
        let feed = truth_feed(controls, &truth);

        let output = FusionLoop::new(EqualWeightFusion)
            .run(&mut ekf, &mut pf, &feed, &mut rng)
            .unwrap();

        for (k, expected) in truth.iter().enumerate() {
            assert_relative_eq!(output.ekf[k], *expected, epsilon = 1e-9);
            assert_relative_eq!(output.pf[k], *expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_noise_corrects_offset_prior() {
        let dt = 0.1;
        let (controls, truth) = turning_path(100, dt);

        let pf_config = ParticleFilterConfig {
            dt,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(4);
        let mut ekf = zero_noise_ekf(dt, Pose::new(1.0, -1.0, 0.2));
        let mut pf = ParticleFilter::new(&pf_config, &mut rng).unwrap();
        let feed = truth_feed(controls, &truth);

        let output = FusionLoop::new(EqualWeightFusion)
            .run(&mut ekf, &mut pf, &feed, &mut rng)
            .unwrap();

        // A perfect observation against a unit prior snaps the mean onto it
        for (k, expected) in truth.iter().enumerate() {
            assert_relative_eq!(output.ekf[k], *expected, epsilon = 1e-9);
        }
        assert!(ekf.covariance().amax() < 1e-9);
    }
}

mod error_tests {
    use super::*;

    fn filters(config: &FilterConfig, seed: u64) -> (ExtendedKalmanFilter, ParticleFilter, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let ekf = ExtendedKalmanFilter::new(&config.ekf).unwrap();
        let pf = ParticleFilter::new(&config.particle_filter, &mut rng).unwrap();
        (ekf, pf, rng)
    }

    fn feed(ticks: usize, sensors: usize) -> SensorFeed {
        let streams = (0..sensors)
            .map(|i| ObservationStream::new(format!("sensor{i}"), vec![Pose::zeros(); ticks]))
            .collect();
        SensorFeed::new(vec![Control::default(); ticks], streams).unwrap()
    }

    #[test]
    fn test_singular_innovation_stops_the_run() {
        let mut config = FilterConfig::default();
        config.ekf.initial_covariance_scale = 0.0;
        config.ekf.process_noise = Vector3::zeros();
        config.ekf.measurement_noise = Vector3::new(0.0, 1.0, 1.0);
        let (mut ekf, mut pf, mut rng) = filters(&config, 1);

        let err = FusionLoop::new(EqualWeightFusion)
            .run(&mut ekf, &mut pf, &feed(5, 1), &mut rng)
            .unwrap_err();
        assert!(matches!(err, FusionError::Numerical { .. }));
    }

    #[test]
    fn test_non_finite_control_stops_the_run() {
        let (mut ekf, mut pf, mut rng) = filters(&FilterConfig::default(), 5);
        let mut feed = feed(4, 2);
        feed.controls[1] = Control::new(f64::NAN, 0.0);

        let err = FusionLoop::new(EqualWeightFusion)
            .run(&mut ekf, &mut pf, &feed, &mut rng)
            .unwrap_err();
        assert_eq!(err, FusionError::NonFiniteControl { tick: 1 });
        assert_eq!(ekf.tick_count(), 0);
    }

    #[test]
    fn test_reading_count_must_match_strategy() {
        let (mut ekf, mut pf, mut rng) = filters(&FilterConfig::default(), 2);
        let fusion = InverseVarianceFusion::new(vec![Vector3::new(0.1, 0.1, 0.1); 2]).unwrap();

        let err = FusionLoop::new(fusion)
            .run(&mut ekf, &mut pf, &feed(3, 3), &mut rng)
            .unwrap_err();
        assert!(matches!(err, FusionError::ShapeMismatch { expected: 2, found: 3, .. }));
    }

    #[test]
    fn test_non_finite_observation_is_degenerate() {
        let (mut ekf, mut pf, mut rng) = filters(&FilterConfig::default(), 3);
        let mut feed = feed(3, 1);
        feed.streams[0].poses[1] = Pose::new(f64::NAN, 0.0, 0.0);

        let err = FusionLoop::new(EqualWeightFusion)
            .run(&mut ekf, &mut pf, &feed, &mut rng)
            .unwrap_err();
        assert!(matches!(err, FusionError::DegenerateWeights { .. }));
    }

    #[test]
    fn test_dyn_strategy() {
        let (mut ekf, mut pf, mut rng) = filters(&FilterConfig::default(), 4);
        let fusion: Box<dyn ObservationFusion> = Box::new(EqualWeightFusion);
        let output = FusionLoop::new(fusion)
            .run(&mut ekf, &mut pf, &feed(4, 2), &mut rng)
            .unwrap();
        assert_eq!(output.len(), 4);
    }
}

mod determinism_tests {
    use super::*;

    #[test]
    fn test_same_seed_same_estimates() {
        let (controls, truth) = turning_path(60, 0.1);
        let feed = SensorFeed::new(controls, vec![ObservationStream::new("camera", truth)]).unwrap();

        let run = |seed: u64| {
            let config = FilterConfig::default();
            let mut rng = StdRng::seed_from_u64(seed);
            let mut ekf = ExtendedKalmanFilter::new(&config.ekf).unwrap();
            let mut pf = ParticleFilter::new(&config.particle_filter, &mut rng).unwrap();
            FusionLoop::new(EqualWeightFusion)
                .run(&mut ekf, &mut pf, &feed, &mut rng)
                .unwrap()
        };

        let a = run(42);
        assert_eq!(a, run(42));
        assert_ne!(a.pf, run(43).pf);
        // EKF ignores the random source
        assert_eq!(a.ekf, run(43).ekf);
    }
}
