//! Recursive filters estimating position and velocity from position fixes
pub mod kalman;

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

pub use self::kalman::ConstantVelocityFilter;

/// Position (0..3) and velocity (3..6)
pub type StateVector = SVector<f64, 6>;
pub type StateCovariance = SMatrix<f64, 6, 6>;
pub type Measurement = Vector3<f64>;
pub type MeasurementCovariance = Matrix3<f64>;

/// Measurement noise standard deviation per axis [m]
pub const MEASUREMENT_NOISE_STD: f64 = 1e-2;

/// A predict/correct estimator over the 6-dimensional position/velocity state
pub trait RecursiveFilter: Send {
    /// Seed the estimate and the noise models
    fn initialize(
        &mut self,
        state: StateVector,
        covariance: StateCovariance,
        process_noise: StateCovariance,
        measurement_noise: MeasurementCovariance,
    );

    /// Advance the estimate by `dt` seconds
    fn process_update(&mut self, dt: f64);

    /// Blend a position measurement into the estimate
    fn measurement_update(&mut self, measurement: &Measurement, dt: f64);

    fn state(&self) -> StateVector;

    fn covariance(&self) -> StateCovariance;

    fn name(&self) -> &str;
}

/// Noise diagonals derived from the motion bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParameters {
    pub process: StateVector,
    pub measurement: Vector3<f64>,
}

impl NoiseParameters {
    /// Process noise from the displacement and velocity change a bounded
    /// acceleration can cause over one nominal sample period.
    pub fn from_bounds(max_accel: f64, sample_period: f64) -> Self {
        let dt = sample_period;
        let pos_std = 0.5 * max_accel * dt * dt;
        let vel_std = max_accel * dt;
        let process = StateVector::from_column_slice(&[
            pos_std, pos_std, pos_std, vel_std, vel_std, vel_std,
        ])
        .map(|v| v * v);
        let measurement = Vector3::repeat(MEASUREMENT_NOISE_STD * MEASUREMENT_NOISE_STD);
        NoiseParameters {
            process,
            measurement,
        }
    }

    pub fn process_covariance(&self) -> StateCovariance {
        StateCovariance::from_diagonal(&self.process)
    }

    pub fn measurement_covariance(&self) -> MeasurementCovariance {
        MeasurementCovariance::from_diagonal(&self.measurement)
    }
}
