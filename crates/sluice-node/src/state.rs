//! Shared node state for the HTTP handlers.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::commands::NodeCommand;
use crate::node::Services;

/// State handed to every HTTP handler.
pub struct NodeState {
    /// When the node started.
    pub start_time: Instant,
    /// Read access to the engine. Mutations go through `command_tx`.
    pub services: Arc<Services>,
    /// Channel to send commands to the command loop.
    pub command_tx: mpsc::Sender<NodeCommand>,
}

impl NodeState {
    pub fn new(services: Arc<Services>, command_tx: mpsc::Sender<NodeCommand>) -> Self {
        Self {
            start_time: Instant::now(),
            services,
            command_tx,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
