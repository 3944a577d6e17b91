//! Angular velocity from consecutive orientation samples

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

/// Steps at or below this length do not produce a new rate
pub const MIN_DIFFERENTIATION_DT: f64 = 1e-6;

/// Single-step finite difference of the rotation matrix
#[derive(Debug, Clone)]
pub struct AngularVelocityEstimator {
    prev_rotation: Matrix3<f64>,
    angular_velocity: Vector3<f64>,
}

impl AngularVelocityEstimator {
    pub fn new() -> Self {
        AngularVelocityEstimator {
            prev_rotation: Matrix3::identity(),
            angular_velocity: Vector3::zeros(),
        }
    }

    /// Feed the orientation observed `dt` seconds after the previous one and
    /// return the current rate estimate.
    ///
    /// With `R_dot = (R - R_prev) / dt` the skew matrix `R_dot * R^T` carries
    /// the rate in its off-diagonal entries. When `dt` is too small the last
    /// rate is kept. The stored rotation is replaced on every call.
    pub fn update(&mut self, orientation: &UnitQuaternion<f64>, dt: f64) -> Vector3<f64> {
        let rotation = orientation.to_rotation_matrix().into_inner();

        if dt > MIN_DIFFERENTIATION_DT {
            let rotation_dot = (rotation - self.prev_rotation) / dt;
            let w_hat = rotation_dot * rotation.transpose();
            self.angular_velocity = Vector3::new(w_hat[(2, 1)], w_hat[(0, 2)], w_hat[(1, 0)]);
        }
        self.prev_rotation = rotation;

        self.angular_velocity
    }

    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.angular_velocity
    }

    pub fn previous_rotation(&self) -> &Matrix3<f64> {
        &self.prev_rotation
    }
}

impl Default for AngularVelocityEstimator {
    fn default() -> Self {
        Self::new()
    }
}
