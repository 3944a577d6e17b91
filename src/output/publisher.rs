//! Outbound message sinks

use crate::error::PublishError;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

/// Somewhere to deliver messages of one type
pub trait Publisher<M>: Send {
    fn publish(&self, msg: &M) -> Result<(), PublishError>;

    /// Topic or channel name, for logging
    fn topic(&self) -> &str;
}

/// Keeps every published message in memory
#[derive(Debug)]
pub struct MemoryPublisher<M> {
    topic: String,
    messages: Arc<Mutex<Vec<M>>>,
}

impl<M: Clone> MemoryPublisher<M> {
    pub fn new(topic: &str) -> Self {
        MemoryPublisher {
            topic: topic.to_string(),
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle to the published messages
    pub fn messages(&self) -> Arc<Mutex<Vec<M>>> {
        Arc::clone(&self.messages)
    }
}

impl<M: Clone + Send> Publisher<M> for MemoryPublisher<M> {
    fn publish(&self, msg: &M) -> Result<(), PublishError> {
        self.messages
            .lock()
            .map_err(|_| PublishError::Closed(self.topic.clone()))?
            .push(msg.clone());
        Ok(())
    }

    fn topic(&self) -> &str {
        &self.topic
    }
}

/// Forwards messages into an in-process channel
pub struct ChannelPublisher<M> {
    topic: String,
    tx: UnboundedSender<M>,
}

impl<M> ChannelPublisher<M> {
    pub fn new(topic: &str, tx: UnboundedSender<M>) -> Self {
        ChannelPublisher {
            topic: topic.to_string(),
            tx,
        }
    }
}

impl<M: Clone + Send> Publisher<M> for ChannelPublisher<M> {
    fn publish(&self, msg: &M) -> Result<(), PublishError> {
        self.tx
            .send(msg.clone())
            .map_err(|_| PublishError::Closed(self.topic.clone()))
    }

    fn topic(&self) -> &str {
        &self.topic
    }
}
