//! Server Events
//!
//! What the server reports to whoever is presenting it (a terminal, a log
//! window). The core keeps no presentation state of its own; it only pushes
//! events into an optional channel.

use std::net::SocketAddr;

use crossbeam::channel::{Receiver, Sender};

/// Something that happened on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// The listener is bound and accepting
    Listening { addr: SocketAddr },

    /// A connection was handed to a worker
    Connected { peer: String },

    /// A listing was sent
    Listed { peer: String, count: usize },

    /// A notice was sent in full
    Sent { peer: String, name: String, bytes: u64 },

    /// A requested notice does not exist
    NotFound { peer: String, name: String },

    /// The peer closed the connection
    Disconnected { peer: String },

    /// The connection was abandoned after an error
    Failed { peer: String, error: String },
}

/// Cloneable handle that publishes events, or drops them if nobody listens
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<Sender<ServerEvent>>,
}

impl EventSink {
    /// A sink that discards everything
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Create a sink and the receiver that observes it
    pub fn channel() -> (Self, Receiver<ServerEvent>) {
        let (tx, rx) = crossbeam::channel::unbounded();
        (Self { sender: Some(tx) }, rx)
    }

    /// Publish an event; a dropped receiver is not an error
    pub fn emit(&self, event: ServerEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
