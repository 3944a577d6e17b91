//! Kalman-filtered odometry from an external pose sensor
//!
//! Pose measurements (motion capture, GPS-like fixes) are fused by a
//! constant-velocity Kalman filter into position and velocity, an angular
//! rate is differentiated from the measured orientation, and the result is
//! republished as global odometry, origin-relative local odometry, a raw pose
//! relay and optionally a transform.
pub mod common;
pub mod config;
pub mod error;
pub mod node;
pub mod output;
pub mod perception;
#[cfg(feature = "ros")]
pub mod ros;

pub use crate::config::NodeConfig;
pub use crate::error::{ConfigError, NodeError, PublishError};
pub use crate::node::{CycleReport, GpsOdomNode, OutputChannels};

/// Install the global `tracing` subscriber; `RUST_LOG` overrides `default_level`
pub fn init_logging(default_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
