//! Error types for the odometry node

use thiserror::Error;

/// Fatal configuration problems detected at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("gps_odom: child_frame_id required for publishing tf")]
    MissingChildFrame,

    #[error("pose_topic must not be empty")]
    MissingPoseTopic,

    #[error("gps_fps must be positive, got {0}")]
    InvalidRate(f64),

    #[error("max_accel must be finite and non-negative, got {0}")]
    InvalidMaxAccel(f64),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors that abort node construction
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("measurement source closed before the first pose arrived")]
    SourceClosed,
}

/// Failure to hand a message to an outbound sink
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("channel {0} is closed")]
    Closed(String),

    #[error("transport error on {topic}: {message}")]
    Transport { topic: String, message: String },
}
