use std::fmt;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::ServerMessage;

/// Outgoing message queue of one client connection. The transport drains it
/// into the socket; rooms only ever push.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A client connection as the coordinator sees it.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    outbox: Outbox,
}

impl Connection {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            id: ConnectionId::new(),
            outbox,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Queue a message for this connection. A closed socket drops it.
    pub fn send(&self, msg: ServerMessage) {
        let _ = self.outbox.send(msg);
    }
}
