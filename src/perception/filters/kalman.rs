//! Linear Kalman filter with a constant-velocity motion model

use super::{
    Measurement, MeasurementCovariance, RecursiveFilter, StateCovariance, StateVector,
};
use nalgebra::SMatrix;
use tracing::warn;

type ObservationMatrix = SMatrix<f64, 3, 6>;

/// Kalman filter over `[position, velocity]` observed through position only
#[derive(Debug, Clone)]
pub struct ConstantVelocityFilter {
    state: StateVector,
    covariance: StateCovariance,
    process_noise: StateCovariance,
    measurement_noise: MeasurementCovariance,
    observation: ObservationMatrix,
}

impl ConstantVelocityFilter {
    pub fn new() -> Self {
        let mut observation = ObservationMatrix::zeros();
        observation.fixed_view_mut::<3, 3>(0, 0).fill_with_identity();
        ConstantVelocityFilter {
            state: StateVector::zeros(),
            covariance: StateCovariance::identity(),
            process_noise: StateCovariance::zeros(),
            measurement_noise: MeasurementCovariance::identity(),
            observation,
        }
    }

    fn transition(dt: f64) -> StateCovariance {
        let mut f = StateCovariance::identity();
        f.fixed_view_mut::<3, 3>(0, 3).fill_diagonal(dt);
        f
    }
}

impl Default for ConstantVelocityFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecursiveFilter for ConstantVelocityFilter {
    fn initialize(
        &mut self,
        state: StateVector,
        covariance: StateCovariance,
        process_noise: StateCovariance,
        measurement_noise: MeasurementCovariance,
    ) {
        self.state = state;
        self.covariance = covariance;
        self.process_noise = process_noise;
        self.measurement_noise = measurement_noise;
    }

    fn process_update(&mut self, dt: f64) {
        let f = Self::transition(dt);
        self.state = f * self.state;
        self.covariance = f * self.covariance * f.transpose() + self.process_noise;
    }

    // The position model does not depend on the time since the last fix.
    fn measurement_update(&mut self, measurement: &Measurement, _dt: f64) {
        let h = &self.observation;
        let innovation = measurement - h * self.state;
        let s = h * self.covariance * h.transpose() + self.measurement_noise;

        let Some(s_inv) = s.try_inverse() else {
            warn!("Innovation covariance is singular, skipping measurement update");
            return;
        };

        let gain = self.covariance * h.transpose() * s_inv;
        self.state += gain * innovation;

        // Joseph form keeps the covariance symmetric positive semi-definite
        let i_kh = StateCovariance::identity() - gain * h;
        self.covariance = i_kh * self.covariance * i_kh.transpose()
            + gain * self.measurement_noise * gain.transpose();
    }

    fn state(&self) -> StateVector {
        self.state
    }

    fn covariance(&self) -> StateCovariance {
        self.covariance
    }

    fn name(&self) -> &str {
        "ConstantVelocityFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::filters::NoiseParameters;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use nalgebra::Vector3;

    fn initialized(position: Vector3<f64>) -> ConstantVelocityFilter {
        let noise = NoiseParameters::from_bounds(5.0, 0.05);
        let mut state = StateVector::zeros();
        state.fixed_rows_mut::<3>(0).copy_from(&position);
        let mut kf = ConstantVelocityFilter::new();
        kf.initialize(
            state,
            StateCovariance::identity(),
            noise.process_covariance(),
            noise.measurement_covariance(),
        );
        kf
    }

    #[test]
    fn prediction_integrates_velocity() {
        let mut kf = ConstantVelocityFilter::new();
        let state = StateVector::from_column_slice(&[1.0, 2.0, 3.0, 0.5, -1.0, 2.0]);
        kf.initialize(
            state,
            StateCovariance::identity(),
            StateCovariance::zeros(),
            MeasurementCovariance::identity(),
        );
        kf.process_update(0.1);
        let x = kf.state();
        assert_relative_eq!(x[0], 1.05, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.9, epsilon = 1e-12);
        assert_relative_eq!(x[2], 3.2, epsilon = 1e-12);
        assert_eq!(x.fixed_rows::<3>(3), state.fixed_rows::<3>(3));
        // position variance grows by dt^2 * velocity variance
        assert_relative_eq!(kf.covariance()[(0, 0)], 1.01, epsilon = 1e-12);
        assert_relative_eq!(kf.covariance()[(0, 3)], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn zero_step_prediction_only_adds_process_noise() {
        let mut kf = initialized(Vector3::new(1.0, 1.0, 1.0));
        let before = kf.covariance();
        kf.process_update(0.0);
        assert_eq!(kf.state(), StateVector::from_column_slice(&[1.0, 1.0, 1.0, 0.0, 0.0, 0.0]));
        let q = NoiseParameters::from_bounds(5.0, 0.05).process_covariance();
        assert_relative_eq!(kf.covariance(), before + q, epsilon = 1e-15);
    }

    #[test]
    fn update_pulls_position_toward_measurement() {
        let mut kf = initialized(Vector3::zeros());
        kf.process_update(0.05);
        kf.measurement_update(&Vector3::new(1.0, 0.0, 0.0), 0.05);
        let x = kf.state();
        assert!(x[0] > 0.9 && x[0] < 1.0);
        assert_abs_diff_eq!(x[1], 0.0, epsilon = 1e-12);
        assert!(kf.covariance()[(0, 0)] < 1e-3);
    }

    #[test]
    fn covariance_stays_symmetric() {
        let mut kf = initialized(Vector3::zeros());
        for k in 1..50 {
            kf.process_update(0.05);
            kf.measurement_update(&Vector3::new(0.1 * k as f64, 0.0, -0.05 * k as f64), 0.05);
        }
        let p = kf.covariance();
        assert_relative_eq!(p, p.transpose(), epsilon = 1e-12);
    }

    #[test]
    fn singular_innovation_leaves_estimate_untouched() {
        let mut kf = ConstantVelocityFilter::new();
        kf.initialize(
            StateVector::zeros(),
            StateCovariance::zeros(),
            StateCovariance::zeros(),
            MeasurementCovariance::zeros(),
        );
        kf.measurement_update(&Vector3::new(1.0, 1.0, 1.0), 0.05);
        assert_eq!(kf.state(), StateVector::zeros());
    }
}
