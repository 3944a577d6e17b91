//! Sources of pose measurements

use crate::common::PoseStamped;
use std::collections::VecDeque;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// A blocking stream of pose measurements
pub trait MeasurementSource {
    /// Wait for the next measurement; `None` once the source is closed
    fn next_measurement(&mut self) -> Option<PoseStamped>;
}

/// Receiving half of an in-process pose channel
pub struct ChannelSource {
    rx: UnboundedReceiver<PoseStamped>,
}

impl ChannelSource {
    pub fn new(rx: UnboundedReceiver<PoseStamped>) -> Self {
        ChannelSource { rx }
    }
}

/// Create a connected sender and source
pub fn pose_channel() -> (UnboundedSender<PoseStamped>, ChannelSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, ChannelSource::new(rx))
}

impl MeasurementSource for ChannelSource {
    // Must not be called from inside an async runtime.
    fn next_measurement(&mut self) -> Option<PoseStamped> {
        self.rx.blocking_recv()
    }
}

impl MeasurementSource for VecDeque<PoseStamped> {
    fn next_measurement(&mut self) -> Option<PoseStamped> {
        self.pop_front()
    }
}

/// Adapts any iterator of measurements, e.g. a file being replayed
pub struct IterSource<I>(pub I);

impl<I> MeasurementSource for IterSource<I>
where
    I: Iterator<Item = PoseStamped>,
{
    fn next_measurement(&mut self) -> Option<PoseStamped> {
        self.0.next()
    }
}
