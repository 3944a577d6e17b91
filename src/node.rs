//! The odometry node: startup and the per-measurement cycle

use crate::common::{Odometry, PoseStamped, TransformStamped};
use crate::config::{NodeConfig, Topics, RELAY_FRAME_ID};
use crate::error::{ConfigError, NodeError};
use crate::output::{
    MemoryPublisher, OdometryOutputs, OutputComposer, Publisher, TransformBroadcaster,
};
use crate::perception::filters::{StateCovariance, StateVector};
use crate::perception::{
    AngularVelocityEstimator, FusionCycle, Localizer, MeasurementSource, NoiseParameters,
    RecursiveFilter,
};
use nalgebra::Vector3;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Where each output goes
pub struct OutputChannels {
    pub odom: Box<dyn Publisher<Odometry>>,
    pub local_odom: Box<dyn Publisher<Odometry>>,
    pub relay: Box<dyn Publisher<PoseStamped>>,
    /// Only used when transform publishing is enabled
    pub tf: Option<Box<dyn Publisher<TransformStamped>>>,
}

/// Handles to everything published through [`OutputChannels::recording`]
#[derive(Debug, Clone)]
pub struct RecordedOutputs {
    pub odom: Arc<Mutex<Vec<Odometry>>>,
    pub local_odom: Arc<Mutex<Vec<Odometry>>>,
    pub relay: Arc<Mutex<Vec<PoseStamped>>>,
    pub tf: Arc<Mutex<Vec<TransformStamped>>>,
}

impl OutputChannels {
    /// In-memory sinks on the given topics
    pub fn recording(topics: &Topics) -> (Self, RecordedOutputs) {
        let odom = MemoryPublisher::new(&topics.odom);
        let local_odom = MemoryPublisher::new(&topics.local_odom);
        let relay = MemoryPublisher::new(&topics.relay);
        let tf = MemoryPublisher::new(&topics.tf);
        let recorded = RecordedOutputs {
            odom: odom.messages(),
            local_odom: local_odom.messages(),
            relay: relay.messages(),
            tf: tf.messages(),
        };
        let channels = OutputChannels {
            odom: Box::new(odom),
            local_odom: Box::new(local_odom),
            relay: Box::new(relay),
            tf: Some(Box::new(tf)),
        };
        (channels, recorded)
    }
}

/// Result of handling one measurement
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub fusion: FusionCycle,
    pub angular_velocity: Vector3<f64>,
    pub outputs: OdometryOutputs,
    pub transform: Option<TransformStamped>,
}

/// Kalman-filtered odometry from a stream of pose measurements
pub struct GpsOdomNode {
    name: String,
    initial_pose: PoseStamped,
    localizer: Localizer,
    angular: AngularVelocityEstimator,
    composer: OutputComposer,
    broadcaster: Option<TransformBroadcaster>,
    channels: OutputChannels,
}

impl GpsOdomNode {
    /// Block on `source` for the first measurement, then initialize from it.
    ///
    /// The configuration is checked before waiting so a bad setup fails
    /// immediately.
    pub fn wait_for_first(
        config: &NodeConfig,
        filter: Box<dyn RecursiveFilter>,
        source: &mut dyn MeasurementSource,
        channels: OutputChannels,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        info!(
            "Kalman Filter Node started! Listening to topic: {}",
            config.pose_topic
        );
        info!("Waiting for first position measurement...");
        let first = source.next_measurement().ok_or(NodeError::SourceClosed)?;
        Ok(Self::initialize(config, filter, first, channels)?)
    }

    /// Build the node around `first` as the initial pose
    pub fn initialize(
        config: &NodeConfig,
        mut filter: Box<dyn RecursiveFilter>,
        first: PoseStamped,
        channels: OutputChannels,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let p = first.pose.position;
        info!("Initial position: {}\t{}\t{}", p.x, p.y, p.z);
        info!(
            max_accel = config.max_accel,
            publish_tf = config.publish_tf,
            child_frame_id = %config.child_frame_id,
            pose_topic = %config.pose_topic,
            node_name = %config.node_name,
            gps_fps = config.gps_fps,
            "Resolved parameters"
        );

        let noise = NoiseParameters::from_bounds(config.max_accel, config.sample_period());
        let mut state = StateVector::zeros();
        state.fixed_rows_mut::<3>(0).copy_from(&p.to_vector());
        filter.initialize(
            state,
            StateCovariance::identity(),
            noise.process_covariance(),
            noise.measurement_covariance(),
        );
        debug!(filter = filter.name(), "Filter initialized");

        let broadcaster = config
            .publish_tf
            .then(|| TransformBroadcaster::new(&config.child_frame_id));
        if broadcaster.is_some() && channels.tf.is_none() {
            warn!("Transform publishing enabled but no transform sink was provided");
        }

        Ok(GpsOdomNode {
            name: config.node_name.clone(),
            composer: OutputComposer::new(p.to_vector(), RELAY_FRAME_ID),
            initial_pose: first,
            localizer: Localizer::new(filter),
            angular: AngularVelocityEstimator::new(),
            broadcaster,
            channels,
        })
    }

    /// Fuse one measurement and publish every view of the result
    pub fn handle_measurement(&mut self, msg: &PoseStamped) -> CycleReport {
        let fusion = self.localizer.fuse(msg);
        let angular_velocity = self
            .angular
            .update(&msg.pose.orientation.to_unit(), fusion.dt_proc);
        let outputs = self
            .composer
            .compose(msg, &fusion.posterior, &angular_velocity);

        publish(self.channels.odom.as_ref(), &outputs.global);

        let transform = self.broadcaster.as_ref().map(|broadcaster| {
            broadcaster.transform_for(&outputs.global.pose.pose, &outputs.global.header)
        });
        if let (Some(tf), Some(sink)) = (&transform, &self.channels.tf) {
            publish(sink.as_ref(), tf);
        }

        publish(self.channels.local_odom.as_ref(), &outputs.local);
        publish(self.channels.relay.as_ref(), &outputs.relay);

        CycleReport {
            fusion,
            angular_velocity,
            outputs,
            transform,
        }
    }

    /// Process measurements until the source closes, returning the count
    pub fn spin(&mut self, source: &mut dyn MeasurementSource) -> usize {
        let mut handled = 0;
        while let Some(msg) = source.next_measurement() {
            self.handle_measurement(&msg);
            handled += 1;
        }
        info!(handled, "Measurement source closed");
        handled
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_pose(&self) -> &PoseStamped {
        &self.initial_pose
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    pub fn publishes_transform(&self) -> bool {
        self.broadcaster.is_some()
    }
}

fn publish<M>(publisher: &dyn Publisher<M>, msg: &M) {
    if let Err(e) = publisher.publish(msg) {
        warn!("Failed to publish on {}: {}", publisher.topic(), e);
    }
}
