//! Perception: measurement sources, filtering and rate estimation
pub mod angular_velocity;
pub mod filters;
pub mod localization;
pub mod sensors;

pub use self::angular_velocity::AngularVelocityEstimator;
pub use self::filters::{ConstantVelocityFilter, NoiseParameters, RecursiveFilter};
pub use self::localization::{FusedState, FusionCycle, Localizer};
pub use self::sensors::MeasurementSource;
