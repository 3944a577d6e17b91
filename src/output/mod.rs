//! Output messages derived from one fusion cycle
pub mod publisher;
pub mod transform;

use crate::common::{Covariance36, Odometry, Point, PoseStamped};
use crate::perception::FusedState;
use nalgebra::{Matrix3, Vector3};

pub use self::publisher::{ChannelPublisher, MemoryPublisher, Publisher};
pub use self::transform::TransformBroadcaster;

/// The three views published per measurement
#[derive(Debug, Clone, PartialEq)]
pub struct OdometryOutputs {
    pub global: Odometry,
    pub local: Odometry,
    pub relay: PoseStamped,
}

/// Projects a fused state onto the outbound message types
#[derive(Debug, Clone)]
pub struct OutputComposer {
    initial_position: Vector3<f64>,
    relay_frame_id: String,
}

impl OutputComposer {
    /// `initial_position` is the origin of the local frame
    pub fn new(initial_position: Vector3<f64>, relay_frame_id: &str) -> Self {
        OutputComposer {
            initial_position,
            relay_frame_id: relay_frame_id.to_string(),
        }
    }

    pub fn initial_position(&self) -> Vector3<f64> {
        self.initial_position
    }

    pub fn compose(
        &self,
        msg: &PoseStamped,
        fused: &FusedState,
        angular_velocity: &Vector3<f64>,
    ) -> OdometryOutputs {
        let global = self.global_odometry(msg, fused, angular_velocity);
        let local = self.local_odometry(&global);
        let relay = self.pose_relay(msg);
        OdometryOutputs {
            global,
            local,
            relay,
        }
    }

    /// Fused position and velocity, measured orientation
    pub fn global_odometry(
        &self,
        msg: &PoseStamped,
        fused: &FusedState,
        angular_velocity: &Vector3<f64>,
    ) -> Odometry {
        let mut odom = Odometry {
            header: msg.header.clone(),
            child_frame_id: msg.header.frame_id.clone(),
            ..Default::default()
        };

        odom.pose.pose.position = Point::from_vector(&fused.position());
        odom.pose.pose.orientation = msg.pose.orientation;
        odom.pose.covariance = embed_covariance(&fused.position_covariance());

        odom.twist.twist.linear = Point::from_vector(&fused.velocity());
        odom.twist.twist.angular = Point::from_vector(angular_velocity);
        odom.twist.covariance = embed_covariance(&fused.velocity_covariance());

        odom
    }

    /// Global odometry shifted so the startup position is the origin
    pub fn local_odometry(&self, global: &Odometry) -> Odometry {
        let mut local = global.clone();
        let position = &mut local.pose.pose.position;
        position.x -= self.initial_position.x;
        position.y -= self.initial_position.y;
        position.z -= self.initial_position.z;
        local
    }

    /// The raw measurement, re-stamped into the relay frame
    pub fn pose_relay(&self, msg: &PoseStamped) -> PoseStamped {
        let mut relay = msg.clone();
        relay.header.frame_id = self.relay_frame_id.clone();
        relay
    }
}

/// Place a 3x3 block at the top-left of a row-major 6x6 array
fn embed_covariance(block: &Matrix3<f64>) -> Covariance36 {
    let mut cov = [0.0; 36];
    for i in 0..3 {
        for j in 0..3 {
            cov[6 * i + j] = block[(i, j)];
        }
    }
    cov
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Header, Pose, Quaternion, Stamp};
    use crate::perception::filters::{StateCovariance, StateVector};

    fn measurement() -> PoseStamped {
        PoseStamped {
            header: Header {
                stamp: Stamp::new(3, 250_000_000),
                frame_id: "mocap".to_string(),
            },
            pose: Pose {
                position: Point::new(1.5, 2.5, 3.5),
                orientation: Quaternion::new(0.1, 0.2, 0.3, 0.9),
            },
        }
    }

    fn fused() -> FusedState {
        let mut covariance = StateCovariance::zeros();
        for i in 0..6 {
            for j in 0..6 {
                covariance[(i, j)] = (10 * i + j + 1) as f64;
            }
        }
        FusedState {
            state: StateVector::from_column_slice(&[1.0, 2.0, 3.0, 0.4, 0.5, 0.6]),
            covariance,
        }
    }

    fn composer() -> OutputComposer {
        OutputComposer::new(Vector3::new(0.25, -1.0, 2.0), "fcu")
    }

    #[test]
    fn global_uses_fused_state_and_raw_orientation() {
        let msg = measurement();
        let w = Vector3::new(0.01, 0.02, 0.03);
        let odom = composer().global_odometry(&msg, &fused(), &w);

        assert_eq!(odom.header, msg.header);
        assert_eq!(odom.child_frame_id, "mocap");
        assert_eq!(odom.pose.pose.position, Point::new(1.0, 2.0, 3.0));
        assert_eq!(odom.pose.pose.orientation, msg.pose.orientation);
        assert_eq!(odom.twist.twist.linear, Point::new(0.4, 0.5, 0.6));
        assert_eq!(odom.twist.twist.angular, Point::new(0.01, 0.02, 0.03));
    }

    #[test]
    fn covariance_blocks_without_cross_terms() {
        let fused = fused();
        let odom = composer().global_odometry(&measurement(), &fused, &Vector3::zeros());

        for i in 0..6 {
            for j in 0..6 {
                let pose = odom.pose.covariance[6 * i + j];
                let twist = odom.twist.covariance[6 * i + j];
                if i < 3 && j < 3 {
                    assert_eq!(pose, fused.covariance[(i, j)]);
                    assert_eq!(twist, fused.covariance[(3 + i, 3 + j)]);
                } else {
                    assert_eq!(pose, 0.0, "pose slot ({i}, {j})");
                    assert_eq!(twist, 0.0, "twist slot ({i}, {j})");
                }
            }
        }
    }

    #[test]
    fn local_subtracts_initial_position_only() {
        let composer = composer();
        let out = composer.compose(&measurement(), &fused(), &Vector3::new(0.0, 0.0, 1.0));

        let g = out.global.pose.pose.position;
        let l = out.local.pose.pose.position;
        assert_eq!(l.x, g.x - 0.25);
        assert_eq!(l.y, g.y - -1.0);
        assert_eq!(l.z, g.z - 2.0);

        assert_eq!(out.local.header, out.global.header);
        assert_eq!(out.local.pose.pose.orientation, out.global.pose.pose.orientation);
        assert_eq!(out.local.pose.covariance, out.global.pose.covariance);
        assert_eq!(out.local.twist, out.global.twist);
    }

    #[test]
    fn relay_passes_raw_pose_through() {
        let msg = measurement();
        let out = composer().compose(&msg, &fused(), &Vector3::zeros());
        assert_eq!(out.relay.pose, msg.pose);
        assert_eq!(out.relay.header.stamp, msg.header.stamp);
        assert_eq!(out.relay.header.frame_id, "fcu");
    }
}
