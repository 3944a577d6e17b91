use anyhow::{Error, Result};
use clap::Parser;
use gps_odom::perception::sensors::pose_channel;
use gps_odom::perception::ConstantVelocityFilter;
use gps_odom::ros::{from_ros_pose_stamped, RosPublisher};
use gps_odom::{GpsOdomNode, NodeConfig, OutputChannels};
use rclrs::{Context, CreateBasicExecutor, RclrsErrorFilter, SpinOptions, QOS_PROFILE_DEFAULT};
use std::path::PathBuf;
use std::thread;
use tracing::{error, info};

use geometry_msgs::msg::PoseStamped;
use nav_msgs::msg::Odometry;
use tf2_msgs::msg::TFMessage;

/// ROS 2 node publishing Kalman-filtered odometry from pose measurements
#[derive(Debug, Parser)]
#[command(name = "gps_odom_node")]
struct Args {
    /// TOML node configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Arguments after `--ros-args` belong to rcl
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    ros_args: Vec<String>,
}

fn main() {
    gps_odom::init_logging("info");
    let args = Args::parse();

    let config = match NodeConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}: {}", NodeConfig::default().node_name, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config.clone()) {
        error!("{}: {:#}", config.node_name, e);
        std::process::exit(1);
    }
}

fn run(config: NodeConfig) -> Result<(), Error> {
    let mut executor = Context::default_from_env()?.create_basic_executor();
    let node = executor.create_node("gps_odom")?;
    let topics = config.topics();

    let odom_publisher = node.create_publisher::<Odometry>(&topics.odom, QOS_PROFILE_DEFAULT)?;
    let local_odom_publisher =
        node.create_publisher::<Odometry>(&topics.local_odom, QOS_PROFILE_DEFAULT)?;
    let relay_publisher =
        node.create_publisher::<PoseStamped>(&topics.relay, QOS_PROFILE_DEFAULT)?;
    let tf_publisher = if config.publish_tf {
        Some(node.create_publisher::<TFMessage>(&topics.tf, QOS_PROFILE_DEFAULT)?)
    } else {
        None
    };

    let channels = OutputChannels {
        odom: Box::new(RosPublisher::new(&topics.odom, odom_publisher)),
        local_odom: Box::new(RosPublisher::new(&topics.local_odom, local_odom_publisher)),
        relay: Box::new(RosPublisher::new(&topics.relay, relay_publisher)),
        tf: tf_publisher.map(|publisher| {
            Box::new(RosPublisher::new(&topics.tf, publisher))
                as Box<dyn gps_odom::output::Publisher<_>>
        }),
    };

    // Callbacks only enqueue; the worker thread owns all filter state.
    let (tx, mut source) = pose_channel();
    let _pose_subscription = node.create_subscription::<PoseStamped, _>(
        &topics.pose,
        QOS_PROFILE_DEFAULT,
        move |msg: PoseStamped| {
            let _ = tx.send(from_ros_pose_stamped(&msg));
        },
    )?;

    let worker_config = config.clone();
    thread::spawn(move || {
        let filter = Box::new(ConstantVelocityFilter::new());
        match GpsOdomNode::wait_for_first(&worker_config, filter, &mut source, channels) {
            Ok(mut odom_node) => {
                odom_node.spin(&mut source);
            }
            Err(e) => {
                error!("{}: {}", worker_config.node_name, e);
                std::process::exit(1);
            }
        }
    });

    info!("gps_odom node initialized. Spinning...");
    executor
        .spin(SpinOptions::default())
        .first_error()
        .map_err(|err| err.into())
}
