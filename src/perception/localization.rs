//! Fusion of pose measurements into a position/velocity estimate

use super::filters::{RecursiveFilter, StateCovariance, StateVector};
use crate::common::{PoseStamped, Stamp};
use nalgebra::{Matrix3, Vector3};
use tracing::trace;

/// Gate on the a-priori innovation. Not consulted: every measurement is
/// accepted.
pub const HYPOTHESIS_TEST_THRESHOLD: f64 = 0.5;

/// Filter estimate at one point of the cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedState {
    pub state: StateVector,
    pub covariance: StateCovariance,
}

impl FusedState {
    pub fn read(filter: &dyn RecursiveFilter) -> Self {
        FusedState {
            state: filter.state(),
            covariance: filter.covariance(),
        }
    }

    pub fn position(&self) -> Vector3<f64> {
        self.state.fixed_rows::<3>(0).into_owned()
    }

    pub fn velocity(&self) -> Vector3<f64> {
        self.state.fixed_rows::<3>(3).into_owned()
    }

    /// Position-position block
    pub fn position_covariance(&self) -> Matrix3<f64> {
        self.covariance.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Velocity-velocity block
    pub fn velocity_covariance(&self) -> Matrix3<f64> {
        self.covariance.fixed_view::<3, 3>(3, 3).into_owned()
    }
}

/// Last seen stamp, seeded from the first stamp it is asked about
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Clock {
    last: Option<Stamp>,
}

impl Clock {
    /// Seconds since the previous tick; zero on the first tick
    pub fn tick(&mut self, stamp: Stamp) -> f64 {
        let previous = *self.last.get_or_insert(stamp);
        self.last = Some(stamp);
        stamp.seconds_since(previous)
    }

    pub fn last(&self) -> Option<Stamp> {
        self.last
    }
}

/// Time since the last prediction and time since the last accepted
/// measurement. Fed by the same stream but tracked separately.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClockPair {
    pub process: Clock,
    pub measurement: Clock,
}

/// Everything one fusion cycle produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionCycle {
    pub dt_proc: f64,
    pub dt_meas: f64,
    /// Estimate after the time update, before the measurement
    pub prior: FusedState,
    pub posterior: FusedState,
}

/// Drives the filter once per measurement
pub struct Localizer {
    filter: Box<dyn RecursiveFilter>,
    clocks: ClockPair,
}

impl Localizer {
    /// Wrap an already initialized filter
    pub fn new(filter: Box<dyn RecursiveFilter>) -> Self {
        Localizer {
            filter,
            clocks: ClockPair::default(),
        }
    }

    /// Predict up to the measurement time, then correct with its position
    pub fn fuse(&mut self, msg: &PoseStamped) -> FusionCycle {
        let stamp = msg.header.stamp;

        let dt_proc = self.clocks.process.tick(stamp);
        self.filter.process_update(dt_proc);

        let prior = FusedState::read(self.filter.as_ref());

        let dt_meas = self.clocks.measurement.tick(stamp);
        let measurement = msg.pose.position.to_vector();
        trace!(
            dt_proc,
            dt_meas,
            innovation = (measurement - prior.position()).norm(),
            "Fusing pose measurement"
        );
        self.filter.measurement_update(&measurement, dt_meas);

        FusionCycle {
            dt_proc,
            dt_meas,
            prior,
            posterior: FusedState::read(self.filter.as_ref()),
        }
    }

    pub fn current(&self) -> FusedState {
        FusedState::read(self.filter.as_ref())
    }

    pub fn clocks(&self) -> &ClockPair {
        &self.clocks
    }

    pub fn filter_name(&self) -> &str {
        self.filter.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Header, Point, Pose};
    use crate::perception::filters::{Measurement, MeasurementCovariance};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Process(f64),
        Measurement(Measurement, f64),
    }

    /// Records calls; the state is the last measurement, velocity set to the
    /// number of calls so reads can be told apart.
    struct RecordingFilter {
        calls: Arc<Mutex<Vec<Call>>>,
        state: StateVector,
    }

    impl RecursiveFilter for RecordingFilter {
        fn initialize(
            &mut self,
            state: StateVector,
            _covariance: StateCovariance,
            _process_noise: StateCovariance,
            _measurement_noise: MeasurementCovariance,
        ) {
            self.state = state;
        }

        fn process_update(&mut self, dt: f64) {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call::Process(dt));
            self.state[3] = calls.len() as f64;
        }

        fn measurement_update(&mut self, measurement: &Measurement, dt: f64) {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call::Measurement(*measurement, dt));
            self.state.fixed_rows_mut::<3>(0).copy_from(measurement);
            self.state[3] = calls.len() as f64;
        }

        fn state(&self) -> StateVector {
            self.state
        }

        fn covariance(&self) -> StateCovariance {
            StateCovariance::identity() * self.state[3]
        }

        fn name(&self) -> &str {
            "RecordingFilter"
        }
    }

    fn pose_at(t: f64, x: f64) -> PoseStamped {
        PoseStamped {
            header: Header {
                stamp: Stamp::from_secs_f64(t),
                frame_id: "world".to_string(),
            },
            pose: Pose {
                position: Point::new(x, 0.0, 0.0),
                ..Default::default()
            },
        }
    }

    fn recording() -> (Localizer, Arc<Mutex<Vec<Call>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let filter = RecordingFilter {
            calls: Arc::clone(&calls),
            state: StateVector::zeros(),
        };
        (Localizer::new(Box::new(filter)), calls)
    }

    #[test]
    fn predict_then_correct_with_both_clocks() {
        let (mut localizer, calls) = recording();
        let first = localizer.fuse(&pose_at(10.0, 1.0));
        let second = localizer.fuse(&pose_at(10.25, 2.0));

        assert_eq!(first.dt_proc, 0.0);
        assert_eq!(first.dt_meas, 0.0);
        assert!((second.dt_proc - 0.25).abs() < 1e-9);
        assert!((second.dt_meas - 0.25).abs() < 1e-9);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0], Call::Process(0.0));
        assert_eq!(calls[1], Call::Measurement(Vector3::new(1.0, 0.0, 0.0), 0.0));
        assert!(matches!(calls[2], Call::Process(dt) if (dt - 0.25).abs() < 1e-9));
        assert!(matches!(calls[3], Call::Measurement(m, _) if m.x == 2.0));
    }

    #[test]
    fn prior_is_read_between_updates() {
        let (mut localizer, _) = recording();
        let cycle = localizer.fuse(&pose_at(0.0, 3.0));
        // one call before the prior read, two before the posterior read
        assert_eq!(cycle.prior.state[3], 1.0);
        assert_eq!(cycle.posterior.state[3], 2.0);
        assert_eq!(cycle.posterior.position(), Vector3::new(3.0, 0.0, 0.0));
        assert_eq!(cycle.posterior, localizer.current());
    }

    #[test]
    fn every_measurement_is_accepted() {
        let (mut localizer, calls) = recording();
        localizer.fuse(&pose_at(0.0, 0.0));
        // wildly inconsistent jump is still fused
        let cycle = localizer.fuse(&pose_at(0.05, 1.0e6));
        assert_eq!(cycle.posterior.position().x, 1.0e6);
        let measured = calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, Call::Measurement(..)))
            .count();
        assert_eq!(measured, 2);
    }

    #[test]
    fn backwards_stamp_gives_negative_dt() {
        let (mut localizer, _) = recording();
        localizer.fuse(&pose_at(5.0, 0.0));
        let cycle = localizer.fuse(&pose_at(4.5, 0.0));
        assert!((cycle.dt_proc + 0.5).abs() < 1e-9);
        assert_eq!(localizer.clocks().process.last(), Some(Stamp::from_secs_f64(4.5)));
    }

    #[test]
    fn clock_seeds_from_first_stamp() {
        let mut clock = Clock::default();
        assert_eq!(clock.tick(Stamp::new(100, 0)), 0.0);
        assert!((clock.tick(Stamp::new(100, 500_000_000)) - 0.5).abs() < 1e-12);
        assert_eq!(clock.tick(Stamp::new(100, 500_000_000)), 0.0);
    }

    #[test]
    fn covariance_blocks_come_from_diagonal_quadrants() {
        let mut covariance = StateCovariance::zeros();
        for i in 0..6 {
            for j in 0..6 {
                covariance[(i, j)] = (10 * i + j) as f64;
            }
        }
        let fused = FusedState {
            state: StateVector::zeros(),
            covariance,
        };
        assert_eq!(fused.position_covariance()[(2, 1)], 21.0);
        assert_eq!(fused.velocity_covariance()[(0, 0)], 33.0);
        assert_eq!(fused.velocity_covariance()[(2, 1)], 54.0);
    }
}
