//! ROS 2 transport: message conversions and rclrs-backed publishers

use crate::common::{
    Header, Odometry, Point, Pose, PoseStamped, Quaternion, Stamp, TransformStamped,
};
use crate::error::PublishError;
use crate::output::Publisher;
use std::sync::Arc;

use builtin_interfaces::msg::Time as RosTime;
use geometry_msgs::msg::{
    Point as RosPoint, Pose as RosPose, PoseStamped as RosPoseStamped,
    Quaternion as RosQuaternion, TransformStamped as RosTransformStamped, Vector3 as RosVector3,
};
use nav_msgs::msg::Odometry as RosOdometry;
use std_msgs::msg::Header as RosHeader;
use tf2_msgs::msg::TFMessage;

fn to_ros_header(header: &Header) -> RosHeader {
    let mut ros = RosHeader::default();
    ros.stamp = RosTime {
        sec: header.stamp.sec,
        nanosec: header.stamp.nanosec,
    };
    ros.frame_id = header.frame_id.clone();
    ros
}

fn to_ros_point(p: &Point) -> RosPoint {
    RosPoint {
        x: p.x,
        y: p.y,
        z: p.z,
    }
}

fn to_ros_vector(v: &Point) -> RosVector3 {
    RosVector3 {
        x: v.x,
        y: v.y,
        z: v.z,
    }
}

fn to_ros_quaternion(q: &Quaternion) -> RosQuaternion {
    RosQuaternion {
        x: q.x,
        y: q.y,
        z: q.z,
        w: q.w,
    }
}

fn to_ros_pose(pose: &Pose) -> RosPose {
    RosPose {
        position: to_ros_point(&pose.position),
        orientation: to_ros_quaternion(&pose.orientation),
    }
}

/// Inbound conversion for the pose subscription
pub fn from_ros_pose_stamped(msg: &RosPoseStamped) -> PoseStamped {
    let p = &msg.pose.position;
    let q = &msg.pose.orientation;
    PoseStamped {
        header: Header {
            stamp: Stamp::new(msg.header.stamp.sec, msg.header.stamp.nanosec),
            frame_id: msg.header.frame_id.clone(),
        },
        pose: Pose {
            position: Point::new(p.x, p.y, p.z),
            orientation: Quaternion::new(q.x, q.y, q.z, q.w),
        },
    }
}

pub fn to_ros_pose_stamped(msg: &PoseStamped) -> RosPoseStamped {
    RosPoseStamped {
        header: to_ros_header(&msg.header),
        pose: to_ros_pose(&msg.pose),
    }
}

pub fn to_ros_odometry(odom: &Odometry) -> RosOdometry {
    let mut ros = RosOdometry::default();
    ros.header = to_ros_header(&odom.header);
    ros.child_frame_id = odom.child_frame_id.clone();
    ros.pose.pose = to_ros_pose(&odom.pose.pose);
    ros.pose.covariance = odom.pose.covariance;
    ros.twist.twist.linear = to_ros_vector(&odom.twist.twist.linear);
    ros.twist.twist.angular = to_ros_vector(&odom.twist.twist.angular);
    ros.twist.covariance = odom.twist.covariance;
    ros
}

pub fn to_ros_transform(tf: &TransformStamped) -> RosTransformStamped {
    let mut ros = RosTransformStamped::default();
    ros.header = to_ros_header(&tf.header);
    ros.child_frame_id = tf.child_frame_id.clone();
    ros.transform.translation = to_ros_vector(&tf.transform.translation);
    ros.transform.rotation = to_ros_quaternion(&tf.transform.rotation);
    ros
}

/// Publishes on an rclrs topic after converting to the ROS message type
pub struct RosPublisher<R: rosidl_runtime_rs::Message> {
    topic: String,
    inner: Arc<rclrs::Publisher<R>>,
}

impl<R: rosidl_runtime_rs::Message> RosPublisher<R> {
    pub fn new(topic: &str, inner: Arc<rclrs::Publisher<R>>) -> Self {
        RosPublisher {
            topic: topic.to_string(),
            inner,
        }
    }

    fn send(&self, msg: R) -> Result<(), PublishError> {
        self.inner
            .publish(msg)
            .map_err(|e| PublishError::Transport {
                topic: self.topic.clone(),
                message: e.to_string(),
            })
    }
}

impl Publisher<Odometry> for RosPublisher<RosOdometry> {
    fn publish(&self, msg: &Odometry) -> Result<(), PublishError> {
        self.send(to_ros_odometry(msg))
    }

    fn topic(&self) -> &str {
        &self.topic
    }
}

impl Publisher<PoseStamped> for RosPublisher<RosPoseStamped> {
    fn publish(&self, msg: &PoseStamped) -> Result<(), PublishError> {
        self.send(to_ros_pose_stamped(msg))
    }

    fn topic(&self) -> &str {
        &self.topic
    }
}

impl Publisher<TransformStamped> for RosPublisher<TFMessage> {
    fn publish(&self, msg: &TransformStamped) -> Result<(), PublishError> {
        self.send(TFMessage {
            transforms: vec![to_ros_transform(msg)],
        })
    }

    fn topic(&self) -> &str {
        &self.topic
    }
}
