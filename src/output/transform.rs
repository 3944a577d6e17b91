//! Rigid transform broadcast of the fused pose

use crate::common::{Header, Pose, Transform, TransformStamped};

/// Builds transforms from the header frame to a fixed child frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformBroadcaster {
    child_frame_id: String,
}

impl TransformBroadcaster {
    pub fn new(child_frame_id: &str) -> Self {
        TransformBroadcaster {
            child_frame_id: child_frame_id.to_string(),
        }
    }

    pub fn child_frame_id(&self) -> &str {
        &self.child_frame_id
    }

    pub fn transform_for(&self, pose: &Pose, header: &Header) -> TransformStamped {
        TransformStamped {
            header: header.clone(),
            child_frame_id: self.child_frame_id.clone(),
            transform: Transform {
                translation: pose.position,
                rotation: pose.orientation,
            },
        }
    }
}
