//! Node configuration, read once at startup from a TOML file

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Topic the pose relay is published on, outside the node's namespace
pub const RELAY_TOPIC: &str = "/mavros/mocap/pose";
/// Frame id stamped on relayed poses
pub const RELAY_FRAME_ID: &str = "fcu";
/// Transform broadcast topic
pub const TF_TOPIC: &str = "/tf";

/// Startup parameters of the odometry node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name, used as the namespace for output topics
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// Topic carrying the incoming pose measurements
    #[serde(default)]
    pub pose_topic: String,

    /// Largest expected acceleration [m/s^2], drives the process noise
    #[serde(default = "default_max_accel")]
    pub max_accel: f64,

    /// Nominal measurement rate [Hz]
    #[serde(default = "default_gps_fps")]
    pub gps_fps: f64,

    #[serde(default = "default_publish_tf")]
    pub publish_tf: bool,

    /// Child frame of the broadcast transform
    #[serde(default = "default_child_frame_id")]
    pub child_frame_id: String,
}

fn default_node_name() -> String {
    "gps_odom".to_string()
}
fn default_max_accel() -> f64 {
    5.0
}
fn default_gps_fps() -> f64 {
    20.0
}
fn default_publish_tf() -> bool {
    true
}
fn default_child_frame_id() -> String {
    "base_link".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            node_name: default_node_name(),
            pose_topic: String::new(),
            max_accel: default_max_accel(),
            gps_fps: default_gps_fps(),
            publish_tf: default_publish_tf(),
            child_frame_id: default_child_frame_id(),
        }
    }
}

impl NodeConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a config document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the node cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pose_topic.trim().is_empty() {
            return Err(ConfigError::MissingPoseTopic);
        }
        if self.publish_tf && self.child_frame_id.is_empty() {
            return Err(ConfigError::MissingChildFrame);
        }
        if !(self.gps_fps.is_finite() && self.gps_fps > 0.0) {
            return Err(ConfigError::InvalidRate(self.gps_fps));
        }
        if !(self.max_accel.is_finite() && self.max_accel >= 0.0) {
            return Err(ConfigError::InvalidMaxAccel(self.max_accel));
        }
        Ok(())
    }

    /// Nominal sample period [s]
    pub fn sample_period(&self) -> f64 {
        1.0 / self.gps_fps
    }

    pub fn topics(&self) -> Topics {
        Topics::for_node(&self.node_name, &self.pose_topic)
    }
}

/// Resolved topic names for one node instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub pose: String,
    pub odom: String,
    pub local_odom: String,
    pub relay: String,
    pub tf: String,
}

impl Topics {
    pub fn for_node(node_name: &str, pose_topic: &str) -> Self {
        let ns = node_name.trim_end_matches('/');
        Topics {
            pose: pose_topic.to_string(),
            odom: format!("{ns}/odom"),
            local_odom: format!("{ns}/local_odom"),
            relay: RELAY_TOPIC.to_string(),
            tf: TF_TOPIC.to_string(),
        }
    }
}
