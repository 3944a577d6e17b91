//! Message types shared by the fusion pipeline and its transports
//!
//! These mirror the ROS `geometry_msgs`/`nav_msgs` layouts closely enough that
//! the `ros` transport is a field-by-field copy, while keeping the core free of
//! any middleware dependency.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Time stamp with ROS `builtin_interfaces/Time` layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stamp {
    pub sec: i32,
    pub nanosec: u32,
}

impl Stamp {
    pub fn new(sec: i32, nanosec: u32) -> Self {
        Stamp { sec, nanosec }
    }

    /// Build a stamp from floating point seconds
    pub fn from_secs_f64(secs: f64) -> Self {
        let whole = secs.floor();
        let mut nanosec = ((secs - whole) * 1e9).round() as u32;
        let mut sec = whole as i32;
        if nanosec >= 1_000_000_000 {
            sec += 1;
            nanosec -= 1_000_000_000;
        }
        Stamp { sec, nanosec }
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + self.nanosec as f64 * 1e-9
    }

    /// Signed elapsed seconds from `earlier` to `self`
    pub fn seconds_since(&self, earlier: Stamp) -> f64 {
        let sec = self.sec as i64 - earlier.sec as i64;
        let nanosec = self.nanosec as i64 - earlier.nanosec as i64;
        sec as f64 + nanosec as f64 * 1e-9
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Stamp,
    pub frame_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Point { x, y, z }
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Point::new(v.x, v.y, v.z)
    }
}

/// Plain 3-vector (velocities, translations)
pub type Vector3Msg = Point;

/// Quaternion as carried on the wire, not necessarily normalized
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::identity()
    }
}

impl Quaternion {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Quaternion { x, y, z, w }
    }

    pub fn identity() -> Self {
        Quaternion::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Normalized rotation represented by this quaternion
    pub fn to_unit(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(self.w, self.x, self.y, self.z))
    }

    pub fn from_unit(q: &UnitQuaternion<f64>) -> Self {
        Quaternion::new(q.i, q.j, q.k, q.w)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

/// Timestamped pose, the inbound measurement and the relay output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub header: Header,
    pub pose: Pose,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    pub linear: Vector3Msg,
    pub angular: Vector3Msg,
}

/// Row-major 6x6 covariance, as in `nav_msgs/Odometry`
pub type Covariance36 = [f64; 36];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseWithCovariance {
    pub pose: Pose,
    #[serde(with = "covariance_serde")]
    pub covariance: Covariance36,
}

impl Default for PoseWithCovariance {
    fn default() -> Self {
        PoseWithCovariance {
            pose: Pose::default(),
            covariance: [0.0; 36],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwistWithCovariance {
    pub twist: Twist,
    #[serde(with = "covariance_serde")]
    pub covariance: Covariance36,
}

impl Default for TwistWithCovariance {
    fn default() -> Self {
        TwistWithCovariance {
            twist: Twist::default(),
            covariance: [0.0; 36],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Odometry {
    pub header: Header,
    pub child_frame_id: String,
    pub pose: PoseWithCovariance,
    pub twist: TwistWithCovariance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vector3Msg,
    pub rotation: Quaternion,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformStamped {
    pub header: Header,
    pub child_frame_id: String,
    pub transform: Transform,
}

// serde only derives arrays up to 32 elements
mod covariance_serde {
    use super::Covariance36;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(cov: &Covariance36, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(cov.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Covariance36, D::Error> {
        let values = Vec::<f64>::deserialize(deserializer)?;
        let len = values.len();
        values
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"36 covariance entries"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn stamp_difference_handles_nanosecond_borrow() {
        let earlier = Stamp::new(10, 900_000_000);
        let later = Stamp::new(11, 100_000_000);
        assert_abs_diff_eq!(later.seconds_since(earlier), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(earlier.seconds_since(later), -0.2, epsilon = 1e-12);
        assert_eq!(later.seconds_since(later), 0.0);
    }

    #[test]
    fn stamp_from_seconds() {
        let stamp = Stamp::from_secs_f64(0.05);
        assert_eq!(stamp, Stamp::new(0, 50_000_000));
        assert_abs_diff_eq!(stamp.as_secs_f64(), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn quaternion_is_normalized_on_conversion() {
        let q = Quaternion::new(0.0, 0.0, 2.0, 2.0).to_unit();
        assert_abs_diff_eq!(q.norm(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q.angle(), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn odometry_json_keeps_full_covariance() {
        let mut odom = Odometry::default();
        odom.pose.covariance[35] = 4.0;
        let json = serde_json::to_string(&odom).unwrap();
        let back: Odometry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, odom);
    }
}
