use anyhow::{Context, Result};
use clap::Parser;
use gps_odom::common::PoseStamped;
use gps_odom::output::Publisher;
use gps_odom::perception::sensors::pose_channel;
use gps_odom::perception::ConstantVelocityFilter;
use gps_odom::{GpsOdomNode, NodeConfig, OutputChannels, PublishError};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;
use tracing::{error, info, warn};

/// Replay recorded pose measurements through the odometry filter.
///
/// Input is one JSON `PoseStamped` per line; every published message is
/// written to stdout as `{"topic": ..., "message": ...}`.
#[derive(Debug, Parser)]
#[command(name = "gps_odom_replay")]
struct Args {
    /// TOML node configuration
    #[arg(short, long)]
    config: PathBuf,

    /// JSON-lines measurement file, stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,
}

/// Writes messages as JSON lines to stdout
struct StdoutPublisher {
    topic: String,
    out: &'static Mutex<io::Stdout>,
}

#[derive(Serialize)]
struct Envelope<'a, M> {
    topic: &'a str,
    message: &'a M,
}

impl<M: Serialize> Publisher<M> for StdoutPublisher {
    fn publish(&self, msg: &M) -> Result<(), PublishError> {
        let transport = |message: String| PublishError::Transport {
            topic: self.topic.clone(),
            message,
        };
        let line = serde_json::to_string(&Envelope {
            topic: &self.topic,
            message: msg,
        })
        .map_err(|e| transport(e.to_string()))?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| PublishError::Closed(self.topic.clone()))?;
        writeln!(out, "{line}").map_err(|e| transport(e.to_string()))
    }

    fn topic(&self) -> &str {
        &self.topic
    }
}

fn stdout_channels(config: &NodeConfig) -> OutputChannels {
    let out: &'static Mutex<io::Stdout> = Box::leak(Box::new(Mutex::new(io::stdout())));
    let topics = config.topics();
    let publisher = |topic: &str| StdoutPublisher {
        topic: topic.to_string(),
        out,
    };
    OutputChannels {
        odom: Box::new(publisher(&topics.odom)),
        local_odom: Box::new(publisher(&topics.local_odom)),
        relay: Box::new(publisher(&topics.relay)),
        tf: config
            .publish_tf
            .then(|| Box::new(publisher(&topics.tf)) as Box<dyn Publisher<_>>),
    }
}

fn run(config: &NodeConfig, input: Option<PathBuf>) -> Result<()> {
    let reader: Box<dyn BufRead + Send> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(&path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let (tx, mut source) = pose_channel();
    let reader_thread = thread::spawn(move || {
        for (lineno, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Stopping replay, read error: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PoseStamped>(&line) {
                Ok(msg) => {
                    if tx.send(msg).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Skipping line {}: {}", lineno + 1, e),
            }
        }
    });

    let mut node = GpsOdomNode::wait_for_first(
        config,
        Box::new(ConstantVelocityFilter::new()),
        &mut source,
        stdout_channels(config),
    )?;
    let handled = node.spin(&mut source);
    info!("Replayed {} measurements through {}", handled, node.name());

    reader_thread
        .join()
        .map_err(|_| anyhow::anyhow!("measurement reader panicked"))?;
    Ok(())
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

    if let Err(e) = run(&config, args.input) {
        error!("{}: {:#}", config.node_name, e);
        std::process::exit(1);
    }
}
